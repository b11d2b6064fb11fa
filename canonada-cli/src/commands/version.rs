//! `canonada version`.

pub fn run() -> anyhow::Result<()> {
    println!("canonada {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}
