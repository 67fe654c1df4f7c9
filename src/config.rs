use std::{
    env::current_exe,
    fs::File,
    io::{BufReader, Write},
    path::PathBuf,
};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::shipper::DEFAULT_INTERVAL_MS;

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    pub midi_device_input: Option<String>,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

fn default_endpoint() -> String {
    "http://127.0.0.1:3000/notes".to_string()
}

fn default_interval_ms() -> u64 {
    DEFAULT_INTERVAL_MS
}

impl Config {
    fn file() -> PathBuf {
        dir_user_setting().join("config.json")
    }

    pub fn load() -> Result<Self> {
        let file = File::open(Self::file())?;
        let reader = BufReader::new(file);
        let config = serde_json::from_reader(reader)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        std::fs::create_dir_all(dir_user_setting())?;
        let mut file = File::create(Self::file())?;
        let json = serde_json::to_string_pretty(&self)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            midi_device_input: None,
            endpoint: default_endpoint(),
            interval_ms: default_interval_ms(),
        }
    }
}

pub fn dir_user_setting() -> PathBuf {
    let exe_path = current_exe().unwrap();
    let dir = exe_path.parent().unwrap();
    dir.join("user/setting")
}
