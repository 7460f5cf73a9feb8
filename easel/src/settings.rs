use easel_core::config::EngineConfig;
use easel_core::pipeline::TemplateParams;

const DOCUMENTATION: &str = r##"# Easel settings. Every field is optional, missing ones take their defaults.
#
# [canvas]
# width = 1080
# height = 1080
# device_pixel_ratio = 1.0
# export = "export.jpg"
#
# [engine.snapshot]
# high_quality = 95
#
# [template]
# primary_color = "#aa1010"
# name_text = "Maria Silva"
# logo_src = "logo.png"

"##;

#[derive(serde::Deserialize, serde::Serialize, Clone, Debug)]
#[serde(default)]
pub struct Canvas {
    pub width: f64,
    pub height: f64,
    pub device_pixel_ratio: f64,
    /// Where the final JPEG export is written.
    pub export: std::path::PathBuf,
}
impl Default for Canvas {
    fn default() -> Self {
        Self {
            width: 1080.0,
            height: 1080.0,
            device_pixel_ratio: 1.0,
            export: "export.jpg".into(),
        }
    }
}

#[derive(serde::Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct Settings {
    pub canvas: Canvas,
    pub engine: EngineConfig,
    pub template: TemplateParams,
}
impl Settings {
    pub const FILENAME: &'static str = "easel.toml";
    /// Read the settings file, defaulting if it is missing or malformed.
    #[must_use]
    pub fn load_or_default(path: &std::path::Path) -> Self {
        let settings: anyhow::Result<Self> = (|| {
            let string = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&string)?)
        })();
        match settings {
            Ok(settings) => settings,
            Err(e) => {
                log::info!("using default settings, {} not loaded: {e}", path.display());
                Self::default()
            }
        }
    }
    /// Write a commented starting point, if none exists yet.
    pub fn write_template(path: &std::path::Path) -> anyhow::Result<()> {
        if path.exists() {
            return Ok(());
        }
        let canvas = toml::to_string_pretty(&Canvas::default())?;
        std::fs::write(path, DOCUMENTATION.to_owned() + "[canvas]\n" + &canvas)?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::Settings;

    #[test]
    fn sections_are_optional() {
        let settings: Settings = toml::from_str(
            r##"
            [canvas]
            width = 500

            [engine.history]
            max_depth = 10

            [template]
            primary_color = "#aa1010"
            name_text = "Maria Silva"
            "##,
        )
        .unwrap();
        assert_eq!(settings.canvas.width, 500.0);
        assert_eq!(settings.canvas.height, 1080.0);
        assert_eq!(settings.engine.history.max_depth, 10);
        assert_eq!(settings.engine.frame.idle_jobs_per_frame, 5);
        assert_eq!(settings.template.name_text, "Maria Silva");
        assert_eq!(settings.template.whats_text, "(00) 0 0000-0000");
        assert!(settings.template.primary_color.is_some());
    }
    #[test]
    fn written_template_reads_back() {
        let dir = std::env::temp_dir().join(format!("easel-settings-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(Settings::FILENAME);
        let _ = std::fs::remove_file(&path);

        Settings::write_template(&path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("primary_color = \"#aa1010\""));
        let settings = Settings::load_or_default(&path);
        assert_eq!(settings.canvas.width, 1080.0);
        assert_eq!(settings.canvas.export, std::path::PathBuf::from("export.jpg"));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
