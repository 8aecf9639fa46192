use anyhow::{Result, anyhow};
use directories::UserDirs;
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use crate::exercise::{ExerciseKind, ExercisePlan};
use crate::landmark::Side;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Meta {
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BicepCurlThresholds {
    pub sides: Vec<Side>,
    pub visibility: f32,
    pub flexed_below: f32,
    pub extended_above: f32,
    pub peak_contraction: f32,
    pub loose_upper_arm: f32,
    pub posture_confidence: f32,
}

impl Default for BicepCurlThresholds {
    fn default() -> Self {
        Self {
            sides: vec![Side::Left, Side::Right],
            visibility: 0.65,
            flexed_below: 90.0,
            extended_above: 120.0,
            peak_contraction: 60.0,
            loose_upper_arm: 40.0,
            posture_confidence: 0.95,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LungeThresholds {
    pub sides: Vec<Side>,
    pub visibility: f32,
    pub flexed_below: f32,
    pub extended_above: f32,
    pub posture_confidence: f32,
}

impl Default for LungeThresholds {
    fn default() -> Self {
        Self {
            sides: vec![Side::Left, Side::Right],
            visibility: 0.65,
            flexed_below: 90.0,
            extended_above: 150.0,
            posture_confidence: 0.95,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SquatThresholds {
    pub visibility: f32,
    pub flexed_below: f32,
    pub extended_above: f32,
    pub foot_shoulder_ratio: [f32; 2],
    pub knee_foot_ratio_up: [f32; 2],
    pub knee_foot_ratio_down: [f32; 2],
    pub posture_confidence: f32,
}

impl Default for SquatThresholds {
    fn default() -> Self {
        Self {
            visibility: 0.6,
            flexed_below: 100.0,
            extended_above: 160.0,
            foot_shoulder_ratio: [1.2, 2.8],
            knee_foot_ratio_up: [0.5, 1.0],
            knee_foot_ratio_down: [0.7, 1.1],
            posture_confidence: 0.95,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlankThresholds {
    pub posture_confidence: f32,
}

impl Default for PlankThresholds {
    fn default() -> Self {
        Self {
            posture_confidence: 0.6,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub meta: Meta,
    #[serde(default)]
    pub bicep_curl: BicepCurlThresholds,
    #[serde(default)]
    pub lunge: LungeThresholds,
    #[serde(default)]
    pub squat: SquatThresholds,
    #[serde(default)]
    pub plank: PlankThresholds,
}

impl Profile {
    pub fn parse(txt: &str) -> Result<Self> {
        let profile: Profile = toml::from_str(txt)?;
        validate_profile(&profile)?;
        Ok(profile)
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let txt = fs::read_to_string(path)
            .map_err(|e| anyhow!("failed to read {}: {e}", path.display()))?;
        Self::parse(&txt).map_err(|e| anyhow!("invalid profile {}: {e}", path.display()))
    }
}

/// Every exercise must build from the profile.
pub fn validate_profile(p: &Profile) -> Result<()> {
    for kind in ExerciseKind::ALL {
        ExercisePlan::build(kind, p)?;
    }
    Ok(())
}

fn default_profile_text() -> &'static str {
    include_str!("../profiles/default.toml")
}

/// Profiles under `~/.config/formctl/profiles`, with `active` naming the
/// one `analyze` uses.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    pub active_name: String,
    pub profiles_dir: PathBuf,
    pub active_ptr: PathBuf,
}

fn config_dir() -> Result<PathBuf> {
    let home = UserDirs::new()
        .ok_or_else(|| anyhow!("cannot determine home directory"))?
        .home_dir()
        .to_path_buf();
    Ok(home.join(".config").join("formctl"))
}

impl ProfileStore {
    pub fn open_or_install_default() -> Result<Self> {
        Self::open_in(&config_dir()?)
    }

    pub fn open_in(cfgdir: &Path) -> Result<Self> {
        let profiles_dir = cfgdir.join("profiles");
        fs::create_dir_all(&profiles_dir)?;

        let def_path = profiles_dir.join("default.toml");
        if !def_path.exists() {
            fs::write(&def_path, default_profile_text())?;
            info!("installed default profile at {}", def_path.display());
        }

        let active_ptr = cfgdir.join("active");
        if !active_ptr.exists() {
            let mut f = fs::File::create(&active_ptr)?;
            f.write_all(b"default")?;
        }

        let active_name = fs::read_to_string(&active_ptr)?.trim().to_string();
        Ok(Self {
            active_name,
            profiles_dir,
            active_ptr,
        })
    }

    pub fn profile_path(&self, name: &str) -> PathBuf {
        self.profiles_dir.join(format!("{name}.toml"))
    }

    pub fn load_active(&self) -> Result<Profile> {
        Profile::load_file(&self.profile_path(&self.active_name))
    }

    /// Switches only if the target profile loads cleanly.
    pub fn set_active(&mut self, name: &str) -> Result<Profile> {
        let p = self.profile_path(name);
        if !p.exists() {
            return Err(anyhow!("profile not found: {}", p.display()));
        }
        let profile = Profile::load_file(&p)?;
        fs::write(&self.active_ptr, name.as_bytes())?;
        self.active_name = name.to_string();
        Ok(profile)
    }

    pub fn list_profiles(&self) -> Vec<String> {
        let mut v = Vec::new();
        if let Ok(rd) = fs::read_dir(&self.profiles_dir) {
            for e in rd.flatten() {
                let path = e.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        v.push(stem.to_string());
                    }
                }
            }
        }
        v.sort();
        v
    }
}
