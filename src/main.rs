mod cli;

use vidresolve::cipher::{decipher, extract_transform_program, TransformProgram};
use vidresolve::common::ByteRange;
use vidresolve::media::build_segment_index;
use vidresolve::{choose_format, config, FormatCriteria, InfoResolver, ResolveOptions};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use tokio_util::sync::CancellationToken;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "vidresolve=trace,vidresolve_cipher=debug,vidresolve_media=debug,vidresolve_common=debug"
                .to_string()
        } else {
            "vidresolve=info,vidresolve_cipher=info,vidresolve_media=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Resolve {
            reference,
            quality,
            itag,
            json,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(resolve(
                &reference,
                quality.or(itag).as_deref(),
                json,
                cli.config.as_deref(),
            ))
        }
        Commands::Decipher { program, token } => decipher_token(&program, &token),
        Commands::Extract { file } => extract_program(&file),
        Commands::Index { file, range, json } => index_file(&file, &range, json),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("vidresolve {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn resolve(
    reference: &str,
    criteria: Option<&str>,
    json: bool,
    config_path: Option<&std::path::Path>,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let criteria: Option<FormatCriteria> = criteria.map(str::parse).transpose()?;
    let resolver = InfoResolver::from_config(&config)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling resolution");
            on_interrupt.cancel();
        }
    });

    let options = ResolveOptions::new().with_cancel(cancel);
    let info = resolver.resolve(reference, &options).await?;

    if let Some(criteria) = criteria {
        let format = choose_format(&info.formats, &criteria)?;
        if json {
            println!("{}", serde_json::to_string_pretty(format)?);
        } else {
            println!("{}", format.url().unwrap_or_default());
        }
        return Ok(());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("Video: {}", info.video_id);
    if let Some(title) = &info.details.title {
        println!("Title: {}", title);
    }
    if let Some(author) = &info.details.author {
        println!("Author: {}", author);
    }
    if let Some(secs) = info.details.length_seconds {
        println!("Duration: {:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60);
    }
    if info.details.is_live {
        println!("Live: yes");
    }
    if let Some(source) = info.source {
        println!("Source: {}", source);
    }

    println!("\nFormats: {}", info.formats.len());
    for format in &info.formats {
        print!("  [{:>3}] {}", format.itag, format.container.as_deref().unwrap_or("?"));
        if let Some(label) = &format.quality_label {
            print!(" {}", label);
        }
        match (format.has_video, format.has_audio) {
            (true, true) => print!(" audio+video"),
            (true, false) => print!(" video only"),
            (false, true) => print!(" audio only"),
            (false, false) => {}
        }
        if let Some(codecs) = &format.codecs {
            print!(" ({})", codecs);
        }
        if let Some(bitrate) = format.bitrate {
            print!(", {} kbps", bitrate / 1000);
        }
        if format.is_dash {
            print!(" [dash]");
        }
        if format.is_hls {
            print!(" [hls]");
        }
        println!();
    }

    Ok(())
}

fn decipher_token(program: &str, token: &str) -> Result<()> {
    let program: TransformProgram = program.parse()?;
    println!("{}", decipher(&program, token));
    Ok(())
}

fn extract_program(file: &std::path::Path) -> Result<()> {
    let code = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read code blob: {:?}", file))?;
    let program = extract_transform_program(&code)?;
    println!("{}", program);
    Ok(())
}

fn index_file(file: &std::path::Path, range: &str, json: bool) -> Result<()> {
    let range: ByteRange = range.parse()?;
    let buffer =
        std::fs::read(file).with_context(|| format!("Failed to read stream prefix: {:?}", file))?;
    let index = build_segment_index(&buffer, range)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&index)?);
        return Ok(());
    }

    println!("Data origin: {}", index.data_origin);
    println!("Timecode scale: {} ns", index.timecode_scale);
    println!("Entries: {}", index.len());
    for segment in index.ranges() {
        let end = segment
            .end
            .map(|end| end.to_string())
            .unwrap_or_else(|| "live edge".to_string());
        println!(
            "  {:>10.3}s  {}-{}",
            index.ticks_to_secs(segment.timestamp),
            segment.start,
            end
        );
    }

    Ok(())
}

fn validate_config(path: Option<&std::path::Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            print_config(&config);
        }
        None => {
            println!("No config file specified, using defaults");
            print_config(&config::Config::default());
        }
    }

    Ok(())
}

fn print_config(config: &config::Config) {
    println!("  Origin: {} ({})", config.origin.base_url, config.origin.language);
    println!("  HTTP timeout: {}s", config.http.timeout_secs);
    if let Some(proxy) = &config.http.proxy {
        println!("  Proxy: {}", proxy);
    }
    println!(
        "  Retries: {} (reload {}), back-off {}-{} ms",
        config.retry.max_retries,
        config.retry.reload_retries,
        config.retry.initial_delay_ms,
        config.retry.max_delay_ms
    );
    match config.cipher.max_programs {
        0 => println!("  Program cache: unbounded"),
        n => println!("  Program cache: {} programs", n),
    }
}
