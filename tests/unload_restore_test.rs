use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;
use whatsapp_ingest::store::traits::{MessageNormalizer, SessionStorage};
use whatsapp_ingest::store::{FileSessionStorage, MemorySessionStorage};
use whatsapp_ingest::types::events::{Delivery, RELOAD_NOTICE_MESSAGE, RELOAD_NOTICE_STATUS};
use whatsapp_ingest::types::message::{NormalizeOptions, NormalizedMessage, RawMessage};
use whatsapp_ingest::{IngestError, MessagePipeline};

/// Copies the raw message and leaves one field explicitly unset.
struct WithUnsetField;

impl MessageNormalizer for WithUnsetField {
    fn normalize(&self, raw: &RawMessage, _options: NormalizeOptions) -> Option<NormalizedMessage> {
        let mut message = NormalizedMessage::new(raw.id.clone(), raw.msg_type.clone());
        message.body = raw.body.clone();
        message.chat_id = raw.chat_id.clone();
        message.extra.insert("quotedMsgObj".into(), None);
        message.extra.insert("ack".into(), Some(json!(1)));
        Some(message)
    }
}

/// Sets a field to an explicit JSON `null`, which is a value, not an unset field.
struct WithNullField;

impl MessageNormalizer for WithNullField {
    fn normalize(&self, raw: &RawMessage, _options: NormalizeOptions) -> Option<NormalizedMessage> {
        let mut message = NormalizedMessage::new(raw.id.clone(), raw.msg_type.clone());
        message.body = raw.body.clone();
        message.extra.insert("quotedMsg".into(), Some(Value::Null));
        Some(message)
    }
}

fn text(id: &str) -> RawMessage {
    RawMessage::incoming(id, "chat")
        .with_body("hi")
        .with_chat("5511999999999@c.us")
}

fn pipeline_with(storage: Arc<dyn SessionStorage>) -> MessagePipeline {
    let _ = env_logger::builder().is_test(true).try_init();
    MessagePipeline::builder()
        .with_normalizer(WithUnsetField)
        .with_storage(storage)
        .build()
        .expect("pipeline should build")
}

fn count_reloads(received: &Arc<Mutex<Vec<Delivery>>>) -> usize {
    received
        .lock()
        .unwrap()
        .iter()
        .filter(|d| d.is_reload())
        .count()
}

#[tokio::test(start_paused = true)]
async fn test_unload_persists_buffer_and_notifies_everyone() {
    let storage = Arc::new(MemorySessionStorage::new());
    let pipeline = pipeline_with(storage.clone());

    let once: Arc<Mutex<Vec<Delivery>>> = Arc::default();
    let always: Arc<Mutex<Vec<Delivery>>> = Arc::default();
    let once_sink = once.clone();
    let always_sink = always.clone();
    pipeline.register_callback(move |d: &Delivery| once_sink.lock().unwrap().push(d.clone()), true);
    pipeline.register_callback(move |d: &Delivery| always_sink.lock().unwrap().push(d.clone()), false);

    // A is delivered (and the one-shot consumer is gone); B is still pending.
    pipeline.on_message_added(text("A"));
    sleep(Duration::from_millis(1001)).await;
    let late: Arc<Mutex<Vec<Delivery>>> = Arc::default();
    let late_sink = late.clone();
    pipeline.register_callback(move |d: &Delivery| late_sink.lock().unwrap().push(d.clone()), true);
    pipeline.on_message_added(text("B"));
    sleep(Duration::from_millis(10)).await;
    assert_eq!(pipeline.pending_messages().len(), 1);

    pipeline.on_unload().expect("unload should persist");

    let saved = storage
        .get_item("saved_msgs")
        .unwrap()
        .expect("buffer should be saved");
    let saved: Vec<Value> = serde_json::from_str(&saved).unwrap();
    let ids: Vec<_> = saved.iter().map(|m| m["id"].as_str().unwrap()).collect();
    assert_eq!(ids, ["A", "B"]);
    for message in &saved {
        let fields = message.as_object().unwrap();
        assert!(!fields.contains_key("quotedMsgObj"));
        assert!(fields.values().all(|v| !v.is_null()));
        assert_eq!(fields["ack"], 1);
    }

    // Every registered consumer hears about the reload exactly once, one-shots included.
    assert_eq!(count_reloads(&once), 0);
    assert_eq!(count_reloads(&always), 1);
    assert_eq!(count_reloads(&late), 1);
    assert_eq!(pipeline.callback_count(), 2);
    match late.lock().unwrap().last() {
        Some(Delivery::Reloading(notice)) => {
            assert_eq!(notice.status, RELOAD_NOTICE_STATUS);
            assert_eq!(notice.message, RELOAD_NOTICE_MESSAGE);
        }
        other => panic!("expected a reload notice, got {other:?}"),
    }

    // Nothing is cleared by the unload itself.
    assert_eq!(pipeline.pending_messages().len(), 1);
    assert_eq!(pipeline.buffered_messages().len(), 2);
    assert!(pipeline.buffered_messages().iter().all(|m| !m.has_undefined()));
}

#[tokio::test(start_paused = true)]
async fn test_unload_overwrites_previous_snapshot() {
    let storage = Arc::new(MemorySessionStorage::new());
    storage
        .set_item("saved_msgs", r#"[{"id":"STALE","type":"chat"}]"#.into())
        .unwrap();
    let pipeline = pipeline_with(storage.clone());

    pipeline.on_unload().unwrap();
    assert_eq!(storage.get_item("saved_msgs").unwrap().as_deref(), Some("[]"));
}

#[tokio::test(start_paused = true)]
async fn test_restart_restores_saved_messages() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(FileSessionStorage::new(dir.path()).unwrap());

    let before = pipeline_with(storage.clone());
    before.on_message_added(text("A"));
    before.on_message_added(text("B"));
    sleep(Duration::from_millis(10)).await;
    before.on_unload().unwrap();

    let reopened = Arc::new(FileSessionStorage::new(dir.path()).unwrap());
    let after = pipeline_with(reopened);
    assert_eq!(after.restore_saved().unwrap(), 2);

    after.on_message_added(text("C"));
    sleep(Duration::from_millis(10)).await;
    let ids: Vec<_> = after.buffered_messages().into_iter().map(|m| m.id).collect();
    assert_eq!(ids, ["A", "B", "C"]);
    // Restored messages are not redelivered.
    assert_eq!(after.pending_messages().len(), 1);
}

#[tokio::test]
async fn test_restore_without_snapshot_is_a_no_op() {
    let pipeline = pipeline_with(Arc::new(MemorySessionStorage::new()));
    assert_eq!(pipeline.restore_saved().unwrap(), 0);
    assert!(pipeline.buffered_messages().is_empty());
}

#[tokio::test]
async fn test_restore_rejects_corrupt_snapshot() {
    let storage = Arc::new(MemorySessionStorage::new());
    storage.set_item("saved_msgs", "not json".into()).unwrap();
    let pipeline = pipeline_with(storage);

    assert!(matches!(
        pipeline.restore_saved(),
        Err(IngestError::Serialization(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_null_fields_survive_a_reload() {
    let storage = Arc::new(MemorySessionStorage::new());
    let build = || {
        MessagePipeline::builder()
            .with_normalizer(WithNullField)
            .with_storage(storage.clone())
            .build()
            .expect("pipeline should build")
    };

    let before = build();
    before.on_message_added(text("A"));
    sleep(Duration::from_millis(10)).await;
    before.on_unload().unwrap();
    let first = storage.get_item("saved_msgs").unwrap().expect("buffer should be saved");
    let saved: Vec<Value> = serde_json::from_str(&first).unwrap();
    assert!(saved[0]["quotedMsg"].is_null());
    assert!(saved[0].as_object().unwrap().contains_key("quotedMsg"));

    let after = build();
    assert_eq!(after.restore_saved().unwrap(), 1);
    after.on_unload().unwrap();
    assert_eq!(storage.get_item("saved_msgs").unwrap(), Some(first));
}
