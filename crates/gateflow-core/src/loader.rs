//! 宣言ファイルのロード
//!
//! パースと検証をまとめて行います。

use crate::error::Result;
use crate::model::Declarations;
use crate::parser::parse_kdl_file;
use std::path::Path;
use tracing::{debug, info, instrument};

/// gate.kdl を読み込み、検証済みの宣言を返す
#[instrument(skip(path), fields(path = %path.as_ref().display()))]
pub fn load_declarations<P: AsRef<Path>>(path: P) -> Result<Declarations> {
    debug!("Parsing declaration file");
    let decl = parse_kdl_file(path.as_ref())?;

    debug!("Validating declarations");
    decl.validate()?;

    let set = &decl.resources;
    info!(
        models = set.models.len(),
        teams = set.teams.len(),
        member_sets = set.member_sets.len(),
        keys = set.keys.len(),
        "Declarations loaded"
    );
    Ok(decl)
}
