//! Handler for `ferry env`.

use miette::Result;

use ferry_core::config::credentials_env_path;
use ferry_core::publication::SigningMode;
use ferry_ops::ops_env::env_report;

use super::config_snapshot;

pub fn exec(reveal: bool) -> Result<()> {
    let report = env_report(&config_snapshot()?, reveal);

    println!("Credentials (environment, then {}):", credentials_env_path().display());
    for entry in &report.entries {
        match (entry.key, &entry.display) {
            (Some(key), Some(value)) => println!("  {:<22} {key} = {value}", entry.field),
            _ => println!("  {:<22} (not set)", entry.field),
        }
    }

    println!();
    match &report.signing {
        Ok(SigningMode::Enabled) => println!("Signing: enabled"),
        Ok(SigningMode::Disabled) => println!("Signing: disabled (no signing key configured)"),
        Err(e) => println!("Signing: misconfigured: {e}"),
    }
    println!(
        "Repository credentials: {}",
        if report.repository_credentials { "set" } else { "not set" }
    );
    Ok(())
}
