//! 設定管理を行うモジュール

use std::path::{
    Path,
    PathBuf,
};

use super::{
    ConfigError,
    TranslateSettings,
    loader,
};

/// `.translate.json` から読み込んだ設定を保持する
///
/// [`TranslateServiceBuilder::config`](crate::TranslateServiceBuilder::config)
/// に渡してサービスを構築する。
#[derive(Default, Debug, Clone)]
pub struct ConfigManager {
    /// 検証済みの設定
    settings: TranslateSettings,

    /// 設定の読み込み元ファイル
    source: Option<PathBuf>,
}

impl ConfigManager {
    /// デフォルト設定で作成
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `start` から親ディレクトリへ遡って見つかった設定ファイルを読み込む
    ///
    /// ファイルが見つからない場合はデフォルト値に戻す。
    /// エラー時は現在の設定を変更しない。
    ///
    /// # Errors
    /// - ファイル読み込みエラー
    /// - JSON パースエラー
    /// - バリデーションエラー
    pub fn load_settings(&mut self, start: &Path) -> Result<(), ConfigError> {
        let Some(path) = loader::find_config_file(start) else {
            tracing::debug!(start = %start.display(), "No translate settings file found");
            *self = Self::default();
            return Ok(());
        };

        let settings = loader::load_file(&path)?;
        settings.validate().map_err(ConfigError::ValidationErrors)?;

        tracing::debug!(path = %path.display(), ?settings, "Translate settings loaded");
        self.settings = settings;
        self.source = Some(path);
        Ok(())
    }

    /// 現在の設定を取得
    #[must_use]
    pub const fn settings(&self) -> &TranslateSettings {
        &self.settings
    }

    /// 設定を読み込んだファイル（デフォルト値の場合は `None`）
    #[must_use]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}
