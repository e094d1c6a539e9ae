use actix_web::{Error, HttpRequest, HttpResponse, get, rt, web};
use actix_ws::Message;
use futures::StreamExt;
use log::{debug, info, warn};
use tokio::sync::broadcast::error::RecvError;

use super::models::AppState;

/// Dashboard feed: one JSON text frame per tip change, `{kind, block}`.
#[get("/ws/")]
pub async fn block_events(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Payload,
) -> Result<HttpResponse, Error> {
    let (response, mut session, mut inbound) = actix_ws::handle(&req, body)?;
    let mut events = state.events.subscribe();
    info!("WS - dashboard subscribed ({} open)", state.events.subscribers());

    rt::spawn(async move {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Ok(event) => {
                        let text = match serde_json::to_string(&event) {
                            Ok(text) => text,
                            Err(e) => {
                                warn!("WS - could not encode block #{}: {e}", event.block.index);
                                continue;
                            }
                        };
                        if session.text(text).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(missed)) => {
                        debug!("WS - subscriber fell behind, skipped {missed} events");
                    }
                    Err(RecvError::Closed) => break,
                },
                frame = inbound.next() => match frame {
                    Some(Ok(Message::Ping(bytes))) => {
                        if session.pong(&bytes).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(reason))) => {
                        let _ = session.close(reason).await;
                        return;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!("WS - protocol error: {e}");
                        break;
                    }
                    None => break,
                },
            }
        }
        let _ = session.close(None).await;
    });

    Ok(response)
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use tokio_tungstenite::tungstenite::Message;

    use crate::testing::{eventually, spawn_node};

    async fn next_json<S>(socket: &mut S) -> serde_json::Value
    where
        S: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
    {
        loop {
            match socket.next().await {
                Some(Ok(Message::Text(text))) => return serde_json::from_str(&text).unwrap(),
                Some(Ok(_)) => continue,
                other => panic!("socket ended: {other:?}"),
            }
        }
    }

    #[actix_web::test]
    async fn streams_tip_changes() {
        let (address, state) = spawn_node(|_| {});
        let (mut socket, _) = tokio_tungstenite::connect_async(format!("ws://{address}/api/v1/ws/"))
            .await
            .unwrap();
        assert!(eventually(|| state.events.subscribers() == 1).await);

        let mined = state.ledger.append("live".into(), 1);
        let event = next_json(&mut socket).await;
        assert_eq!(event["kind"], "mined");
        assert_eq!(event["block"]["hash"], mined.hash.as_str());
        assert_eq!(event["block"]["data"], "live");

        let mut longer = state.ledger.all();
        for i in 0..2 {
            let next = crate::blockchain::Block::seal(longer.last().unwrap(), i.to_string(), 1);
            longer.push(next);
        }
        assert!(state.ledger.replace(longer));
        let event = next_json(&mut socket).await;
        assert_eq!(event["kind"], "replaced");
        assert_eq!(event["block"]["index"], 3);
    }

    #[actix_web::test]
    async fn plain_get_is_not_upgraded() {
        let (address, _) = spawn_node(|_| {});
        let resp = reqwest::get(format!("http://{address}/api/v1/ws/")).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
    }
}
