//! Handler for `ferry pubkey`.

use miette::Result;

use ferry_ops::ops_pubkey::public_key;

use super::config_snapshot;

pub fn exec() -> Result<()> {
    let key = public_key(&config_snapshot()?)?;
    eprintln!("Key id: {}", key.key_id);
    print!("{}", key.pem);
    Ok(())
}
