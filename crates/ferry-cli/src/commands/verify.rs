//! Handler for `ferry verify`.

use std::path::Path;

use miette::Result;

use ferry_ops::ops_verify::verify_file;
use ferry_util::progress::status;

pub fn exec(file: &Path, signature: &Path, public_key: &Path) -> Result<()> {
    let key_id = verify_file(file, signature, public_key)?;
    status("Verified", &format!("{} (key {key_id})", file.display()));
    Ok(())
}
