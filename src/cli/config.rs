use crate::config::generate::generate_starter_config;
use std::path::PathBuf;

pub fn init(stdout: bool) -> Result<(), Box<dyn std::error::Error>> {
    let contents = generate_starter_config();

    if stdout {
        print!("{contents}");
        return Ok(());
    }

    let target = dirs::home_dir()
        .map(|home| home.join(".config/harborctl/config.yml"))
        .unwrap_or_else(|| PathBuf::from("/etc/harborctl/config.yml"));

    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&target, contents)?;
    println!("Wrote starter config to {}", target.display());
    Ok(())
}
