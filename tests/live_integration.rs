use std::time::{SystemTime, UNIX_EPOCH};

use botconnector_http::{ConnectorClient, ConnectorError, ErrorKind};
use serde_json::json;

fn load_live_conversation() -> Result<(ConnectorClient, String), String> {
    let client = ConnectorClient::from_env()?;
    let conversation_id = std::env::var("BOTCONNECTOR_CONVERSATION_ID")
        .map_err(|_| "missing BOTCONNECTOR_CONVERSATION_ID environment variable".to_owned())?;
    if conversation_id.trim().is_empty() {
        return Err("BOTCONNECTOR_CONVERSATION_ID is set but empty".to_owned());
    }
    Ok((client, conversation_id))
}

fn unique_suffix() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock must be after epoch")
        .as_millis()
}

#[tokio::test]
async fn live_send_update_and_delete_activity() {
    let (client, conversation_id) = match load_live_conversation() {
        Ok(values) => values,
        Err(_) => {
            eprintln!("skipping live test: BOTCONNECTOR_* variables not set");
            return;
        }
    };
    let conversations = client.conversations();
    let text = format!("pipeline live test {}", unique_suffix());

    let sent = conversations
        .send_to_conversation(&conversation_id, &json!({ "type": "message", "text": text }))
        .await
        .expect("send must succeed");
    assert!(!sent.id.is_empty());

    conversations
        .update_activity(
            &conversation_id,
            &sent.id,
            &json!({ "type": "message", "text": format!("{text} (edited)") }),
        )
        .await
        .expect("update must succeed");

    let cleanup = conversations.delete_activity(&conversation_id, &sent.id).await;
    if let Err(err @ ConnectorError::Http { .. }) = cleanup {
        // Not every channel supports deleting activities.
        assert_eq!(err.kind(), ErrorKind::Terminal, "cleanup failed: {err}");
    }
}

#[tokio::test]
async fn live_unknown_conversation_is_terminal() {
    let (client, _) = match load_live_conversation() {
        Ok(values) => values,
        Err(_) => {
            eprintln!("skipping live test: BOTCONNECTOR_* variables not set");
            return;
        }
    };

    let err = client
        .conversations()
        .get_conversation_members(&format!("missing-{}", unique_suffix()))
        .await
        .expect_err("unknown conversation must fail");

    assert_eq!(err.kind(), ErrorKind::Terminal);
}
