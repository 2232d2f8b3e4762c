//! 設定ファイルの探索と読み込み

use std::path::{
    Path,
    PathBuf,
};

use super::{
    ConfigError,
    TranslateSettings,
};

/// 設定ファイル名
pub(super) const CONFIG_FILE_NAME: &str = ".translate.json";

/// `start` から親ディレクトリへ遡って最も近い設定ファイルを探す
pub(super) fn find_config_file(start: &Path) -> Option<PathBuf> {
    start.ancestors().map(|dir| dir.join(CONFIG_FILE_NAME)).find(|path| path.is_file())
}

/// 設定ファイルを読み込む
///
/// # Errors
/// - ファイル読み込みエラー
/// - JSON パースエラー
pub(super) fn load_file(path: &Path) -> Result<TranslateSettings, ConfigError> {
    tracing::debug!(path = %path.display(), "Loading translate settings");

    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
