use std::time::Duration;

use clap::Parser;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

#[derive(Parser)]
#[command(name = "artemisa-cli")]
#[command(about = "Send request lines to an Artemisa server", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "127.0.0.1:3000")]
    addr: String,

    #[arg(short, long, default_value_t = 10)]
    timeout_secs: u64,

    /// Request lines, e.g. "GET /status?x=9". Each is sent on the same connection.
    #[arg(required = true)]
    requests: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let timeout = Duration::from_secs(cli.timeout_secs);

    let stream = tokio::time::timeout(timeout, TcpStream::connect(&cli.addr)).await??;
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    for request in &cli.requests {
        writer.write_all(format!("{}\n", request).as_bytes()).await?;
        writer.flush().await?;

        match tokio::time::timeout(timeout, read_reply(&mut reader)).await? {
            Ok(Some((status, body))) => print_reply(&status, &body)?,
            Ok(None) => {
                eprintln!("Connection closed by server");
                break;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(())
}

/// Read one status line, headers and a `Content-Length` body.
async fn read_reply<R>(reader: &mut R) -> Result<Option<(String, String)>, Box<dyn std::error::Error>>
where
    R: AsyncBufReadExt + AsyncReadExt + Unpin,
{
    let mut status = String::new();
    if reader.read_line(&mut status).await? == 0 {
        return Ok(None);
    }

    let mut length = 0usize;
    loop {
        let mut header = String::new();
        reader.read_line(&mut header).await?;
        let header = header.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                length = value.trim().parse()?;
            }
        }
    }

    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).await?;
    Ok(Some((status.trim_end().to_string(), String::from_utf8(body)?)))
}

fn print_reply(status: &str, body: &str) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", status);
    match serde_json::from_str::<Value>(body) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", body),
    }
    Ok(())
}
