use chrono::Local;
use clap::Parser;
use dashmap::DashMap;
use log::{error, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::oneshot;
use whatsapp_ingest::store::traits::{ChatClient, MessageNormalizer, PnLidLookup};
use whatsapp_ingest::store::{FileSessionStorage, MsgStore};
use whatsapp_ingest::types::events::Delivery;
use whatsapp_ingest::types::message::{
    CIPHERTEXT_TYPE, DecryptionAwait, DecryptionFuture, NormalizeOptions, NormalizedMessage,
    RawMessage,
};
use whatsapp_ingest::{IngestConfig, MessagePipeline, resolve_phone_from_chat_id};

// Feeds stdin lines into an in-memory message store and prints the batches
// the pipeline delivers.
//
// Usage:
//   cargo run                                   # plain text messages from 12345@c.us
//   cargo run -- --chat 100000012345678@lid     # sender without a resolvable phone
//
// A line starting with `!cipher ` arrives undecrypted and is decrypted 1.5s later.
// Ctrl-C persists undelivered messages; the next run restores them.

#[derive(Parser, Debug)]
#[command(about = "Debounced incoming-message pipeline demo")]
struct Args {
    /// Directory used as session storage across runs
    #[arg(long, default_value = "session")]
    session_dir: String,

    /// Chat id the simulated messages come from
    #[arg(long, default_value = "12345@c.us")]
    chat: String,

    /// Debounce window in milliseconds
    #[arg(long, default_value_t = 1000)]
    debounce_ms: u64,
}

/// Plaintext lives here once "decrypted".
#[derive(Default)]
struct Plaintexts {
    bodies: DashMap<String, String>,
    waiters: DashMap<String, oneshot::Receiver<()>>,
}

struct DemoNormalizer {
    plaintexts: Arc<Plaintexts>,
}

impl MessageNormalizer for DemoNormalizer {
    fn normalize(&self, raw: &RawMessage, _options: NormalizeOptions) -> Option<NormalizedMessage> {
        let (msg_type, body) = if raw.is_ciphertext() {
            match self.plaintexts.bodies.get(&raw.id) {
                Some(body) => ("chat".to_string(), Some(body.clone())),
                None => (CIPHERTEXT_TYPE.to_string(), None),
            }
        } else {
            (raw.msg_type.clone(), raw.body.clone())
        };

        let mut message = NormalizedMessage::new(raw.id.clone(), msg_type);
        message.from = raw.from.clone();
        message.chat_id = raw.chat_id.clone();
        message.body = body;
        message.timestamp = raw.timestamp;
        Some(message)
    }
}

struct PendingDecryption {
    id: String,
    plaintexts: Arc<Plaintexts>,
}

impl DecryptionAwait for PendingDecryption {
    fn wait_decrypted(&self) -> Result<Option<DecryptionFuture>, anyhow::Error> {
        let Some((_, rx)) = self.plaintexts.waiters.remove(&self.id) else {
            return Ok(None);
        };
        Ok(Some(Box::pin(async move {
            rx.await.map_err(|e| anyhow::anyhow!("decryption abandoned: {e}"))
        })))
    }
}

/// This demo has no server connection, so LIDs stay unresolved.
struct OfflineClient;

impl ChatClient for OfflineClient {
    fn pn_lid_lookup(&self) -> Option<&dyn PnLidLookup> {
        None
    }
}

fn main() {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "{} [{:<5}] [{}] - {}",
                Local::now().format("%H:%M:%S"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to build tokio runtime");

    if let Err(e) = rt.block_on(run(args)) {
        error!("{e:?}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let storage = Arc::new(FileSessionStorage::new(&args.session_dir)?);
    let plaintexts = Arc::new(Plaintexts::default());

    let pipeline = MessagePipeline::builder()
        .with_config(IngestConfig {
            debounce_window: Duration::from_millis(args.debounce_ms),
            ..Default::default()
        })
        .with_normalizer(DemoNormalizer {
            plaintexts: plaintexts.clone(),
        })
        .with_storage(storage)
        .build()?;

    let restored = pipeline.restore_saved()?;
    if restored > 0 {
        info!("{restored} message(s) from the previous run are buffered");
    }

    pipeline.register_callback(
        |delivery: &Delivery| match delivery {
            Delivery::Batch(batch) => {
                for message in batch.iter() {
                    let from = message.from.clone();
                    let body = message.body.clone().unwrap_or_default();
                    tokio::spawn(async move {
                        let phone = resolve_phone_from_chat_id(&OfflineClient, from.as_deref()).await;
                        info!(
                            "<- {} ({}): {}",
                            from.as_deref().unwrap_or("?"),
                            phone.as_deref().unwrap_or("no phone"),
                            body
                        );
                    });
                }
            }
            Delivery::Reloading(notice) => info!("consumer notified: {}", notice.message),
        },
        false,
    );

    let store = Arc::new(MsgStore::new());
    let listener = pipeline.attach(store.as_ref());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut next_id = 0u64;
    info!("Type messages, Ctrl-C to stop");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                next_id += 1;
                let id = format!("DEMO{next_id:06}");
                let raw = match line.strip_prefix("!cipher ") {
                    Some(text) => schedule_decryption(&id, text, &plaintexts),
                    None => RawMessage::incoming(id, "chat").with_body(line),
                };
                store.add(raw.with_chat(args.chat.clone()));
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    listener.detach();
    pipeline.on_unload()?;
    Ok(())
}

fn schedule_decryption(id: &str, text: &str, plaintexts: &Arc<Plaintexts>) -> RawMessage {
    let (tx, rx) = oneshot::channel();
    plaintexts.waiters.insert(id.to_string(), rx);

    let plaintexts_clone = plaintexts.clone();
    let id_clone = id.to_string();
    let text = text.to_string();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1500)).await;
        plaintexts_clone.bodies.insert(id_clone, text);
        let _ = tx.send(());
    });

    RawMessage::incoming(id, CIPHERTEXT_TYPE).with_decryption(Arc::new(PendingDecryption {
        id: id.to_string(),
        plaintexts: plaintexts.clone(),
    }))
}
