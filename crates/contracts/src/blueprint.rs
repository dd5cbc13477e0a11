//! NodeBlueprint - Config Loader output
//!
//! Describes the complete node configuration: GNSS coupling, estimator-shared
//! constants, and the transport topic names.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete node configuration blueprint
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NodeBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// GNSS coupling settings
    #[serde(default)]
    #[validate(nested)]
    pub gnss: GnssSettings,

    /// Estimator-shared constants
    #[serde(default)]
    #[validate(nested)]
    pub estimator: EstimatorSettings,

    /// Transport topic names (opaque strings)
    #[serde(default)]
    #[validate(nested)]
    pub topics: TopicSettings,
}

/// GNSS coupling settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GnssSettings {
    /// Enable the GNSS path; when false all GNSS streams are inert
    #[serde(default)]
    pub enable: bool,

    /// Calibrate the clock offset online from pulse/trigger pairs;
    /// requires the GNSS path to be enabled
    #[serde(default)]
    pub online_sync: bool,

    /// Static GNSS↔local offset used when online sync is disabled (seconds)
    #[serde(default)]
    pub local_time_diff: f64,

    /// Maximum |t_gnss − t_feature| for pairing an epoch with a frame (seconds)
    #[serde(default = "default_max_gnss_camera_delay")]
    #[validate(range(exclusive_min = 0.0, message = "max_gnss_camera_delay must be > 0"))]
    pub max_gnss_camera_delay: f64,
}

impl Default for GnssSettings {
    fn default() -> Self {
        Self {
            enable: false,
            online_sync: false,
            local_time_diff: 0.0,
            max_gnss_camera_delay: default_max_gnss_camera_delay(),
        }
    }
}

/// Estimator-shared constants
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EstimatorSettings {
    /// Number of cameras feeding the feature tracker
    #[serde(default = "default_num_of_cam")]
    #[validate(range(min = 1, message = "num_of_cam must be >= 1"))]
    pub num_of_cam: u32,

    /// Sliding-window size (keyframes)
    #[serde(default = "default_window_size")]
    #[validate(range(min = 1, message = "window_size must be >= 1"))]
    pub window_size: u32,

    /// Camera-IMU time offset (seconds)
    #[serde(default)]
    pub td: f64,
}

impl Default for EstimatorSettings {
    fn default() -> Self {
        Self {
            num_of_cam: default_num_of_cam(),
            window_size: default_window_size(),
            td: 0.0,
        }
    }
}

/// Transport topic names
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TopicSettings {
    #[serde(default = "default_imu_topic")]
    #[validate(length(min = 1, message = "topic name cannot be empty"))]
    pub imu: String,

    #[serde(default = "default_feature_topic")]
    #[validate(length(min = 1, message = "topic name cannot be empty"))]
    pub feature: String,

    #[serde(default = "default_restart_topic")]
    #[validate(length(min = 1, message = "topic name cannot be empty"))]
    pub restart: String,

    #[serde(default = "default_ephem_topic")]
    #[validate(length(min = 1, message = "topic name cannot be empty"))]
    pub gnss_ephem: String,

    #[serde(default = "default_glo_ephem_topic")]
    #[validate(length(min = 1, message = "topic name cannot be empty"))]
    pub gnss_glo_ephem: String,

    #[serde(default = "default_meas_topic")]
    #[validate(length(min = 1, message = "topic name cannot be empty"))]
    pub gnss_meas: String,

    #[serde(default = "default_iono_topic")]
    #[validate(length(min = 1, message = "topic name cannot be empty"))]
    pub gnss_iono_params: String,

    #[serde(default = "default_time_pulse_topic")]
    #[validate(length(min = 1, message = "topic name cannot be empty"))]
    pub gnss_time_pulse: String,

    #[serde(default = "default_trigger_topic")]
    #[validate(length(min = 1, message = "topic name cannot be empty"))]
    pub local_trigger: String,
}

impl Default for TopicSettings {
    fn default() -> Self {
        Self {
            imu: default_imu_topic(),
            feature: default_feature_topic(),
            restart: default_restart_topic(),
            gnss_ephem: default_ephem_topic(),
            gnss_glo_ephem: default_glo_ephem_topic(),
            gnss_meas: default_meas_topic(),
            gnss_iono_params: default_iono_topic(),
            gnss_time_pulse: default_time_pulse_topic(),
            local_trigger: default_trigger_topic(),
        }
    }
}

impl TopicSettings {
    /// All topic names in declaration order (for uniqueness validation)
    pub fn all(&self) -> [(&'static str, &str); 9] {
        [
            ("imu", &self.imu),
            ("feature", &self.feature),
            ("restart", &self.restart),
            ("gnss_ephem", &self.gnss_ephem),
            ("gnss_glo_ephem", &self.gnss_glo_ephem),
            ("gnss_meas", &self.gnss_meas),
            ("gnss_iono_params", &self.gnss_iono_params),
            ("gnss_time_pulse", &self.gnss_time_pulse),
            ("local_trigger", &self.local_trigger),
        ]
    }
}

fn default_max_gnss_camera_delay() -> f64 {
    0.05
}

fn default_num_of_cam() -> u32 {
    1
}

fn default_window_size() -> u32 {
    10
}

fn default_imu_topic() -> String {
    "/imu0".to_string()
}

fn default_feature_topic() -> String {
    "/feature_tracker/feature".to_string()
}

fn default_restart_topic() -> String {
    "/feature_tracker/restart".to_string()
}

fn default_ephem_topic() -> String {
    "/gnss_driver/ephem".to_string()
}

fn default_glo_ephem_topic() -> String {
    "/gnss_driver/glo_ephem".to_string()
}

fn default_meas_topic() -> String {
    "/gnss_driver/range_meas".to_string()
}

fn default_iono_topic() -> String {
    "/gnss_driver/iono_params".to_string()
}

fn default_time_pulse_topic() -> String {
    "/gnss_driver/time_pulse_info".to_string()
}

fn default_trigger_topic() -> String {
    "/external_trigger".to_string()
}

/// Runtime configuration of the sync core, derived from the blueprint
#[derive(Debug, Clone, Copy)]
pub struct CoreConfig {
    /// GNSS path active
    pub gnss_enabled: bool,

    /// Clock offset calibrated online from pulse/trigger pairs
    pub online_sync: bool,

    /// Static clock offset used when online sync is disabled (seconds)
    pub local_time_diff: f64,

    /// GNSS/camera pairing window (seconds)
    pub max_gnss_camera_delay: f64,

    /// Number of cameras (feature channel decoding)
    pub num_of_cam: u32,
}

impl NodeBlueprint {
    /// Build the runtime core configuration from blueprint data
    pub fn to_core_config(&self) -> CoreConfig {
        CoreConfig {
            gnss_enabled: self.gnss.enable,
            online_sync: self.gnss.online_sync,
            local_time_diff: self.gnss.local_time_diff,
            max_gnss_camera_delay: self.gnss.max_gnss_camera_delay,
            num_of_cam: self.estimator.num_of_cam,
        }
    }
}

impl Default for NodeBlueprint {
    fn default() -> Self {
        Self {
            version: ConfigVersion::V1,
            gnss: GnssSettings::default(),
            estimator: EstimatorSettings::default(),
            topics: TopicSettings::default(),
        }
    }
}
