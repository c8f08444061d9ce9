//! Interactive chat over the ingested document
//!
//! Run with: cargo run --bin chat

use clap::Parser;
use pdf_rag::{Config, RagChain};
use std::io::{self, Write};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(about = "Ask questions about the ingested PDF")]
struct Args {
    /// Answer a single question and exit instead of starting the chat loop
    #[arg(long)]
    question: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf_rag=info,chat=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;
    let chain = RagChain::from_config(&config).await?;

    if let Some(question) = args.question {
        let answer = chain.ask(&question).await?;
        println!("RESPOSTA: {}", answer);
        return Ok(());
    }

    println!("Chat iniciado. Digite 'exit' para sair.");
    loop {
        print!("Faça sua pergunta: ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break; // EOF
        }

        let question = line.trim();
        if question.eq_ignore_ascii_case("exit") {
            break;
        }
        if question.is_empty() {
            continue;
        }

        match chain.ask(question).await {
            Ok(answer) => println!("RESPOSTA: {}", answer),
            Err(e) => tracing::error!("Failed to answer question: {}", e),
        }
    }

    Ok(())
}
