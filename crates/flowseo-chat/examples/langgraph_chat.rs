use std::sync::Arc;

use flowseo_chat::prelude::*;
use flowseo_chat::vendors::langgraph::LangGraphAgent;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<(), ChatError> {
    let agent = Arc::new(LangGraphAgent::from_env()?);
    let mut session = ChatSession::new(agent);

    let mut messages = session.messages();
    let mut typing = session.is_typing();
    let watcher = tokio::spawn(async move {
        loop {
            tokio::select! {
                changed = typing.changed() => {
                    if changed.is_err() { break; }
                    if *typing.borrow() { eprintln!("[assistant is typing]"); }
                }
                changed = messages.changed() => {
                    if changed.is_err() { break; }
                    if let Some(last) = messages.borrow().last() {
                        eprintln!("[{:?}] {}", last.role, last.content);
                    }
                }
            }
        }
    });

    session
        .initialize_thread("demo", Message::system("How can I help with your SEO research?"))
        .await?;
    session
        .send_message("Suggest three long-tail keywords for a home bakery.", false)
        .await?;

    println!("--- final transcript ---");
    for message in session.transcript() {
        println!("{:?}: {}", message.role, message.content);
    }

    drop(session);
    let _ = watcher.await;
    Ok(())
}
