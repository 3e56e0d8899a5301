//! SlotDB Inspector Binary
//!
//! Read-only diagnostics over a store file.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use slotdb::block::Block;
use slotdb::store::{Superblock, SUPERBLOCK_SIZE};
use slotdb::{Config, Store, StoreError};
use tracing_subscriber::{fmt, EnvFilter};

/// SlotDB Inspector
#[derive(Parser, Debug)]
#[command(name = "slotdb-inspect")]
#[command(about = "Inspect the superblock and blocks of a SlotDB file")]
#[command(version)]
struct Args {
    /// Store file
    file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the superblock
    Info,

    /// Print one block's layout and usage
    Block {
        /// File offset of the block
        #[arg(short, long)]
        address: i64,

        /// Record size the block was formatted for
        #[arg(short, long)]
        record_size: usize,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();

    let result = match args.command {
        Commands::Info => info(&args.file).await,
        Commands::Block {
            address,
            record_size,
        } => block(&args.file, address, record_size).await,
    };

    if let Err(e) = result {
        tracing::error!("Inspection failed: {}", e);
        std::process::exit(1);
    }
}

async fn read_superblock(path: &Path) -> Result<Superblock, StoreError> {
    let bytes = tokio::fs::read(path).await?;
    if bytes.len() < SUPERBLOCK_SIZE {
        return Err(StoreError::Corruption(format!(
            "file is {} bytes, shorter than the superblock",
            bytes.len()
        )));
    }
    Superblock::decode(&bytes[..SUPERBLOCK_SIZE])
}

async fn info(path: &Path) -> Result<(), StoreError> {
    let superblock = read_superblock(path).await?;
    let len = tokio::fs::metadata(path).await?.len();
    let blocks = len.saturating_sub(SUPERBLOCK_SIZE as u64) / superblock.block_size as u64;

    println!("file:       {}", path.display());
    println!("magic:      {}", String::from_utf8_lossy(&superblock.magic));
    println!("version:    {}", superblock.version);
    println!("block size: {}", superblock.block_size);
    println!("file size:  {}", len);
    println!("blocks:     {}", blocks);
    Ok(())
}

async fn block(path: &Path, address: i64, record_size: usize) -> Result<(), StoreError> {
    let superblock = read_superblock(path).await?;
    let config = Config::builder()
        .path(path)
        .block_size(superblock.block_size as usize)
        .file_handles(1)
        .build();
    let store = Store::open(config).await?;

    let block = Block::open(address, superblock.block_size as usize, record_size)?;
    let layout = block.layout();
    let used = block.get_used_count(&store).await?;
    let indexes = block.get_used_indexes(&store).await?;

    println!("block:        {}", layout.address);
    println!("record size:  {}", layout.record_size);
    println!("record count: {}", layout.record_count);
    println!("bitmap bytes: {}", layout.bitmap_len);
    println!("first record: {}", layout.first_record_address());
    println!("used count:   {}", used);
    println!("used indexes: {:?}", indexes);

    match block.verify(&store).await {
        Ok(()) => println!("bitmap:       consistent"),
        Err(e) => println!("bitmap:       {}", e),
    }
    Ok(())
}
