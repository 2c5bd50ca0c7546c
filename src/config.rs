//! Sound manifest
//!
//! Per-cue source, gain and loop presets plus the ambient autoplay delay.
//! The defaults reproduce the stock setup: one shared clip for all four
//! cues, ambient at 0.3 and looping, click 0.5, hover 0.2, success 0.6,
//! autoplay two seconds after init. The background music player defaults
//! to the same clip, looping at 0.1.
//!
//! Manifests are JSON. Any field left out keeps the default of its cue:
//!
//! ```json
//! {
//!   "autoplay_delay_ms": 1500,
//!   "cues": {
//!     "ambient": { "source": "sound/drums.ogg" },
//!     "click": { "volume": 0.4 }
//!   },
//!   "music": { "volume": 0.15 }
//! }
//! ```

use crate::context::Cue;
use crate::registry::LoadOptions;
use crate::source::SoundSource;
use crate::{Result, SoundError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Clip shared by every cue in the stock setup
pub const DEFAULT_SOURCE: &str = "sound/sound.mp3";

/// Delay between init and the ambient autoplay attempt
pub const DEFAULT_AUTOPLAY_DELAY_MS: u64 = 2000;

/// Gain of the background music player
pub const DEFAULT_MUSIC_VOLUME: f32 = 0.1;

/// Presets for one cue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CueConfig {
    /// Clip path, relative paths resolve against the manifest directory
    pub source: PathBuf,
    /// Gain in [0, 1]
    pub volume: f32,
    /// Restart when the clip ends
    #[serde(default)]
    pub looping: bool,
}

impl CueConfig {
    fn preset(volume: f32, looping: bool) -> Self {
        Self {
            source: PathBuf::from(DEFAULT_SOURCE),
            volume,
            looping,
        }
    }

    /// Stock preset for `cue`
    pub fn default_for(cue: Cue) -> Self {
        match cue {
            Cue::Ambient => Self::preset(0.3, true),
            Cue::Click => Self::preset(0.5, false),
            Cue::Hover => Self::preset(0.2, false),
            Cue::Success => Self::preset(0.6, false),
        }
    }

    /// Stock preset for the background music player
    pub fn music() -> Self {
        Self::preset(DEFAULT_MUSIC_VOLUME, true)
    }

    /// Clip location
    pub fn source(&self) -> SoundSource {
        SoundSource::path(&self.source)
    }

    /// Registry options for this cue
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions::volume(self.volume).looping(self.looping)
    }
}

/// Presets for the four cues
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CueSet {
    /// Looping background clip
    pub ambient: CueConfig,
    /// Button press
    pub click: CueConfig,
    /// Pointer enter
    pub hover: CueConfig,
    /// Completed action
    pub success: CueConfig,
}

impl Default for CueSet {
    fn default() -> Self {
        Self {
            ambient: CueConfig::default_for(Cue::Ambient),
            click: CueConfig::default_for(Cue::Click),
            hover: CueConfig::default_for(Cue::Hover),
            success: CueConfig::default_for(Cue::Success),
        }
    }
}

impl CueSet {
    /// Presets for `cue`
    pub fn get(&self, cue: Cue) -> &CueConfig {
        match cue {
            Cue::Ambient => &self.ambient,
            Cue::Click => &self.click,
            Cue::Hover => &self.hover,
            Cue::Success => &self.success,
        }
    }

    /// Mutable presets for `cue`
    pub fn get_mut(&mut self, cue: Cue) -> &mut CueConfig {
        match cue {
            Cue::Ambient => &mut self.ambient,
            Cue::Click => &mut self.click,
            Cue::Hover => &mut self.hover,
            Cue::Success => &mut self.success,
        }
    }
}

/// Complete sound setup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawManifest")]
pub struct SoundManifest {
    /// Milliseconds between init and the ambient autoplay attempt
    pub autoplay_delay_ms: u64,
    /// Per-cue presets
    pub cues: CueSet,
    /// Background music player presets
    pub music: CueConfig,
}

impl Default for SoundManifest {
    fn default() -> Self {
        Self {
            autoplay_delay_ms: DEFAULT_AUTOPLAY_DELAY_MS,
            cues: CueSet::default(),
            music: CueConfig::music(),
        }
    }
}

impl SoundManifest {
    /// Parse a JSON manifest
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a JSON manifest. Relative clip paths resolve against the
    /// manifest's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| {
            SoundError::ConfigError(format!(
                "Failed to read manifest '{}': {}",
                path.display(),
                e
            ))
        })?;
        let manifest = Self::from_json_str(&json)?;
        Ok(match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => manifest.with_base_dir(dir),
            _ => manifest,
        })
    }

    /// Point every cue and the music player at the same clip
    pub fn with_shared_source(mut self, source: impl Into<PathBuf>) -> Self {
        let source = source.into();
        for cue in Cue::ALL {
            self.cues.get_mut(cue).source = source.clone();
        }
        self.music.source = source;
        self
    }

    /// Resolve relative clip paths against `dir`
    pub fn with_base_dir(mut self, dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        for cue in Cue::ALL {
            let cfg = self.cues.get_mut(cue);
            if cfg.source.is_relative() {
                cfg.source = dir.join(&cfg.source);
            }
        }
        if self.music.source.is_relative() {
            self.music.source = dir.join(&self.music.source);
        }
        self
    }

    /// Set the autoplay delay, saturating at `u64::MAX` milliseconds
    pub fn with_autoplay_delay(mut self, delay: Duration) -> Self {
        self.autoplay_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Autoplay delay as a [`Duration`]
    pub fn autoplay_delay(&self) -> Duration {
        Duration::from_millis(self.autoplay_delay_ms)
    }

    /// Presets for `cue`
    pub fn cue(&self, cue: Cue) -> &CueConfig {
        self.cues.get(cue)
    }

    /// Check that every gain is a finite value in [0, 1]
    pub fn validate(&self) -> Result<()> {
        let named = Cue::ALL
            .iter()
            .map(|cue| (cue.key(), self.cue(*cue)))
            .chain([("music", &self.music)]);
        for (name, cfg) in named {
            let volume = cfg.volume;
            if !volume.is_finite() || !(0.0..=1.0).contains(&volume) {
                return Err(SoundError::ConfigError(format!(
                    "volume for cue '{}' must be within [0, 1], got {}",
                    name, volume
                )));
            }
        }
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CueOverride {
    source: Option<PathBuf>,
    volume: Option<f32>,
    looping: Option<bool>,
}

impl CueOverride {
    fn apply(self, cfg: &mut CueConfig) {
        if let Some(source) = self.source {
            cfg.source = source;
        }
        if let Some(volume) = self.volume {
            cfg.volume = volume;
        }
        if let Some(looping) = self.looping {
            cfg.looping = looping;
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    autoplay_delay_ms: Option<u64>,
    #[serde(default)]
    cues: BTreeMap<String, CueOverride>,
    music: Option<CueOverride>,
}

impl TryFrom<RawManifest> for SoundManifest {
    type Error = SoundError;

    fn try_from(raw: RawManifest) -> Result<Self> {
        let mut manifest = SoundManifest::default();
        if let Some(delay) = raw.autoplay_delay_ms {
            manifest.autoplay_delay_ms = delay;
        }
        for (name, cue_override) in raw.cues {
            let cue = Cue::from_key(&name).ok_or_else(|| {
                SoundError::ConfigError(format!(
                    "unknown cue '{}', expected one of: ambient, click, hover, success",
                    name
                ))
            })?;
            cue_override.apply(manifest.cues.get_mut(cue));
        }
        if let Some(music) = raw.music {
            music.apply(&mut manifest.music);
        }
        manifest.validate()?;
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;

    #[test]
    fn test_default_presets() {
        let manifest = SoundManifest::default();
        assert_eq!(manifest.autoplay_delay(), Duration::from_secs(2));

        let ambient = manifest.cue(Cue::Ambient);
        assert_relative_eq!(ambient.volume, 0.3);
        assert!(ambient.looping);

        for (cue, volume) in [(Cue::Click, 0.5), (Cue::Hover, 0.2), (Cue::Success, 0.6)] {
            let cfg = manifest.cue(cue);
            assert_relative_eq!(cfg.volume, volume);
            assert!(!cfg.looping);
            assert_eq!(cfg.source, PathBuf::from(DEFAULT_SOURCE));
        }
    }

    #[test]
    fn test_partial_json_keeps_cue_defaults() {
        let manifest = SoundManifest::from_json_str(
            r#"{ "autoplay_delay_ms": 500, "cues": { "ambient": { "source": "drums.ogg" }, "click": { "volume": 0.4 } } }"#,
        )
        .unwrap();

        assert_eq!(manifest.autoplay_delay_ms, 500);
        let ambient = manifest.cue(Cue::Ambient);
        assert_eq!(ambient.source, PathBuf::from("drums.ogg"));
        assert_relative_eq!(ambient.volume, 0.3);
        assert!(ambient.looping);
        assert_relative_eq!(manifest.cue(Cue::Click).volume, 0.4);
        assert_relative_eq!(manifest.cue(Cue::Hover).volume, 0.2);
    }

    #[test]
    fn test_empty_json_is_default() {
        assert_eq!(
            SoundManifest::from_json_str("{}").unwrap(),
            SoundManifest::default()
        );
    }

    #[test]
    fn test_unknown_cue_rejected() {
        let err = SoundManifest::from_json_str(r#"{ "cues": { "boom": { "volume": 0.1 } } }"#)
            .unwrap_err();
        assert!(err.to_string().contains("unknown cue 'boom'"));
    }

    #[test]
    fn test_out_of_range_volume_rejected() {
        let err = SoundManifest::from_json_str(r#"{ "cues": { "hover": { "volume": 1.5 } } }"#)
            .unwrap_err();
        assert!(err.to_string().contains("hover"));
    }

    #[test]
    fn test_serialized_manifest_reads_back() {
        let manifest = SoundManifest::default()
            .with_shared_source("assets/ui.wav")
            .with_autoplay_delay(Duration::from_millis(750));
        let json = serde_json::to_string(&manifest).unwrap();
        assert_eq!(SoundManifest::from_json_str(&json).unwrap(), manifest);
    }

    #[test]
    fn test_load_resolves_against_manifest_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sounds.json");
        let mut file = fs::File::create(&path).unwrap();
        write!(file, r#"{{ "cues": {{ "click": {{ "source": "click.wav" }} }} }}"#).unwrap();

        let manifest = SoundManifest::load(&path).unwrap();
        assert_eq!(manifest.cue(Cue::Click).source, dir.path().join("click.wav"));
        assert_eq!(
            manifest.cue(Cue::Hover).source,
            dir.path().join(DEFAULT_SOURCE)
        );
    }

    #[test]
    fn test_huge_autoplay_delay_saturates() {
        let manifest = SoundManifest::default().with_autoplay_delay(Duration::MAX);
        assert_eq!(manifest.autoplay_delay_ms, u64::MAX);
        assert_eq!(manifest.autoplay_delay(), Duration::from_millis(u64::MAX));
    }

    #[test]
    fn test_music_defaults_and_override() {
        let stock = SoundManifest::default();
        assert_relative_eq!(stock.music.volume, DEFAULT_MUSIC_VOLUME);
        assert!(stock.music.looping);
        assert_eq!(stock.music.source, PathBuf::from(DEFAULT_SOURCE));

        let manifest =
            SoundManifest::from_json_str(r#"{ "music": { "source": "theme.ogg", "volume": 0.15 } }"#)
                .unwrap();
        assert_eq!(manifest.music.source, PathBuf::from("theme.ogg"));
        assert_relative_eq!(manifest.music.volume, 0.15);
        assert!(manifest.music.looping);

        let err = SoundManifest::from_json_str(r#"{ "music": { "volume": -1.0 } }"#).unwrap_err();
        assert!(err.to_string().contains("music"));
    }

    #[test]
    fn test_load_missing_manifest() {
        let err = SoundManifest::load("no/such/manifest.json").unwrap_err();
        assert!(matches!(err, SoundError::ConfigError(_)));
    }
}
