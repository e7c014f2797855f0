//! Config command

use anirec_core::Config;
use anyhow::Result;

pub fn run(config: &Config) -> Result<()> {
    let path = std::env::var("ANIREC_CONFIG")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| Config::default_path());
    let source = if path.exists() { "" } else { " (not found, using defaults)" };

    println!("# {}{}", path.display(), source);
    print!("{}", serde_yaml::to_string(&config.redacted())?);
    Ok(())
}
