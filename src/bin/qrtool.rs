use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;

use barangay_portal::qr::{
    self,
    payload::{document_code_from_scan, QrPayload},
    scanner::{Scanner, StillFrames},
    GrayFrame,
};

#[derive(Parser)]
#[command(name = "qrtool")]
#[command(about = "Print, render and read barangay portal QR codes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Document,
    Resident,
    Employee,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode an id the way the portal does and print it to the terminal
    Encode {
        #[arg(value_enum)]
        kind: Kind,
        id: String,
        /// Also write an SVG file
        #[arg(long)]
        svg: Option<PathBuf>,
    },

    /// Decode a PNG or JPEG image and print the raw payload
    Decode { image: PathBuf },

    /// Read snapshots in order until one holds a code, then print the
    /// document code a lookup would use
    Scan {
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Encode { kind, id, svg } => {
            let payload = match kind {
                Kind::Document => QrPayload::Document(id),
                Kind::Resident => QrPayload::Resident(id),
                Kind::Employee => QrPayload::Employee(id),
            }
            .encode();

            print!("{}", qr::encode_matrix(&payload)?.to_text());
            println!("{}", payload);

            if let Some(path) = svg {
                let markup = qr::encode_svg(&payload, 320)?;
                tokio::fs::write(&path, markup)
                    .await
                    .with_context(|| format!("writing {}", path.display()))?;
                println!("SVG written to {}", path.display());
            }
        }
        Commands::Decode { image } => {
            let bytes = tokio::fs::read(&image)
                .await
                .with_context(|| format!("reading {}", image.display()))?;
            println!("{}", qr::decode_image(&bytes)?);
        }
        Commands::Scan { images } => {
            let mut frames = Vec::with_capacity(images.len());
            for path in &images {
                let bytes = tokio::fs::read(path)
                    .await
                    .with_context(|| format!("reading {}", path.display()))?;
                frames.push(GrayFrame::from_image_bytes(&bytes)?);
            }

            let scanner = Scanner::new(StillFrames::new(frames));
            let raw = scanner.try_acquire()?.scan(&CancellationToken::new()).await?;
            println!("{}", document_code_from_scan(&raw));
        }
    }

    Ok(())
}
