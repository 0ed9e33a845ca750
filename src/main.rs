use anyhow::Context;
use chrono::Local;
use haksa::config::ConfigLoader;
use haksa::models::Identity;
use haksa::observability::init_tracing;
use haksa::services::{Domain, QueryPipeline};
use haksa::storage::StorageFactory;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

const QUIT_COMMANDS: [&str; 3] = ["quit", "exit", "종료"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => ConfigLoader::load_from(&path),
        None => ConfigLoader::load(),
    }
    .context("failed to load configuration")?;
    ConfigLoader::validate(&config)?;

    let _log_guard = init_tracing(&config.logging)?;
    info!("Starting {} ({})", config.app_name, config.environment);

    let executor = StorageFactory::create(&config.database).await?;
    info!("Storage initialized: {}", executor.backend());

    let pipeline = QueryPipeline::new(executor, &config.query);
    let identity = Identity {
        authenticated_student_key: std::env::var("HAKSA_STUDENT_KEY")
            .ok()
            .or_else(|| config.identity.student_key.clone()),
    };
    if identity.student_key().is_none() {
        info!("No student identity configured, student queries will be denied");
    }

    println!("=== 학생 정보 및 강의 상담 시스템 ===\n");
    println!("{}", pipeline.semester_info(Local::now().date_naive()).banner());
    println!("\n직접 질문해보세요 (종료하려면 'quit' 입력):");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\n질문: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if QUIT_COMMANDS.contains(&input.to_lowercase().as_str()) {
            break;
        }
        if input.is_empty() {
            println!("질문을 입력해주세요.");
            continue;
        }

        let domain = Domain::route(input);
        let answer = pipeline
            .handle(domain, input, &identity, Local::now().date_naive())
            .await;
        println!("답변: {}", answer);
    }

    info!("Shutting down\n{}", pipeline.metrics().gather());
    Ok(())
}
