use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 模拟传感器允许的最低采样率 (Hz)
pub const MIN_SIMULATOR_RATE_HZ: f64 = 0.01;

/// 应用配置管理模块
/// 集中管理所有配置项，提供默认值和配置验证

/// 主配置结构
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub window: WindowConfig,
    pub transport: TransportConfig,
    pub mqtt: MqttConfig,
    pub simulator: SimulatorConfig,
    pub estimator: EstimatorConfig,
    pub consumer: ConsumerConfig,
    pub plot: PlotConfig,
}

/// 窗口配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: f32,
    pub height: f32,
    pub title: String,
    pub resizable: bool,
    pub vsync: bool,
    pub hardware_acceleration: bool,
}

/// 数据来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// 设备UART数据经桥接发布到MQTT主题
    Mqtt,
    /// 模拟数据，无需硬件
    Simulated,
}

/// 传输配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub kind: TransportKind,
    /// 重连间隔（固定）
    pub retry_delay_secs: u64,
    /// 等待连接建立的超时时间
    pub scan_timeout_secs: u64,
    /// 连接后无数据超过该时长时告警
    pub stale_after_secs: u64,
}

/// MQTT配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub broker: String,
    pub port: u16,
    pub client_id: String,
    pub topic: String,
    pub qos: u8,
    pub keep_alive: u16,
}

/// 模拟传感器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub rate_hz: f64,
    /// 加速度计各轴均匀噪声幅值 (m/s²)
    pub accel_noise: f64,
    /// 陀螺仪各轴均匀噪声幅值 (rad/s)
    pub gyro_noise: f64,
    /// 运动脉冲周期（秒）
    pub burst_period_secs: f64,
    /// 单次运动脉冲持续时间（秒）
    pub burst_duration_secs: f64,
    /// 脉冲期间水平加速度峰值 (m/s²)
    pub burst_accel: f64,
}

/// 速度在相邻更新之间的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VelocityPolicy {
    /// 每次更新速度从零开始: `v = a·dt`
    ResetEachTick,
    /// 速度累加: `v += a·dt`
    Persist,
}

/// 航位推算配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// |accel.x| 低于该值视为零 (m/s²)
    pub threshold_x: f64,
    /// |accel.y| 低于该值视为零 (m/s²)
    pub threshold_y: f64,
    pub gravity: f64,
    /// 世界坐标系加速度模长低于该值视为静止
    pub motion_threshold: f64,
    /// 各轴位置限幅到 [-axis_limit, axis_limit]
    pub axis_limit: f64,
    pub velocity_policy: VelocityPolicy,
}

/// 消费者配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerConfig {
    pub tick_interval_ms: u64,
    /// 接收缓冲区槽位数，1 表示只保留最新样本
    pub buffer_capacity: usize,
    /// 供界面显示的最近样本数量
    pub history_capacity: usize,
    pub start_paused: bool,
}

/// 绘图配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    /// 每个投影图绘制的末尾轨迹点数
    pub trail_points: usize,
    pub plot_height: f32,
    pub refresh_ms: u64,
    pub colors: PlotColors,
}

/// 绘图颜色配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotColors {
    pub trail: [u8; 3],
    pub head: [u8; 3],
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            title: "SenseTrail - Live Trajectory".to_string(),
            resizable: true,
            vsync: true,
            hardware_acceleration: true,
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: TransportKind::Mqtt,
            retry_delay_secs: 3,
            scan_timeout_secs: 10,
            stale_after_secs: 30,
        }
    }
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker: "localhost".to_string(),
            port: 1883,
            client_id: "sensetrail-client".to_string(),
            topic: "sensors/imu".to_string(),
            qos: 1,
            keep_alive: 5,
        }
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            rate_hz: 50.0,
            accel_noise: 0.2,
            gyro_noise: 0.01,
            burst_period_secs: 4.0,
            burst_duration_secs: 1.0,
            burst_accel: 3.0,
        }
    }
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            threshold_x: 0.5,
            threshold_y: 0.5,
            gravity: 9.81,
            motion_threshold: 1.0,
            axis_limit: 5.0,
            velocity_policy: VelocityPolicy::ResetEachTick,
        }
    }
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            buffer_capacity: 1,
            history_capacity: 100,
            start_paused: false,
        }
    }
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            trail_points: 500,
            plot_height: 320.0,
            refresh_ms: 100,
            colors: PlotColors::default(),
        }
    }
}

impl Default for PlotColors {
    fn default() -> Self {
        Self {
            trail: [0, 90, 200],  // 蓝色
            head: [220, 30, 30],  // 红色
        }
    }
}

impl TransportConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_secs)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }
}

impl SimulatorConfig {
    /// 发送间隔，采样率无法换算为 Duration 时返回 None
    pub fn interval(&self) -> Option<Duration> {
        Duration::try_from_secs_f64(1.0 / self.rate_hz).ok()
    }
}

impl ConsumerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl AppConfig {
    /// 从文件加载配置
    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(ConfigError::IoError)?;

        let config: AppConfig = toml::from_str(&content)
            .map_err(ConfigError::ParseError)?;

        config.validate()?;
        Ok(config)
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)
            .map_err(ConfigError::SerializeError)?;

        std::fs::write(path, content)
            .map_err(ConfigError::IoError)?;

        Ok(())
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.width <= 0.0 || self.window.height <= 0.0 {
            return Err(ConfigError::ValidationError("Window dimensions must be positive".to_string()));
        }

        if self.mqtt.qos > 2 {
            return Err(ConfigError::ValidationError("MQTT QoS must be 0, 1 or 2".to_string()));
        }

        if self.mqtt.topic.is_empty() {
            return Err(ConfigError::ValidationError("MQTT topic must not be empty".to_string()));
        }

        if self.transport.scan_timeout_secs == 0 {
            return Err(ConfigError::ValidationError("Scan timeout must be positive".to_string()));
        }

        if !(self.simulator.rate_hz >= MIN_SIMULATOR_RATE_HZ && self.simulator.rate_hz.is_finite()) {
            return Err(ConfigError::ValidationError(format!(
                "Simulator rate must be a finite value of at least {} Hz",
                MIN_SIMULATOR_RATE_HZ
            )));
        }

        let est = &self.estimator;
        if !(est.axis_limit > 0.0) {
            return Err(ConfigError::ValidationError("Axis limit must be positive".to_string()));
        }

        if est.threshold_x < 0.0 || est.threshold_y < 0.0 || est.motion_threshold < 0.0 {
            return Err(ConfigError::ValidationError("Thresholds must not be negative".to_string()));
        }

        if !est.gravity.is_finite() {
            return Err(ConfigError::ValidationError("Gravity must be finite".to_string()));
        }

        if self.consumer.tick_interval_ms == 0 {
            return Err(ConfigError::ValidationError("Tick interval must be positive".to_string()));
        }

        if self.consumer.buffer_capacity == 0 {
            return Err(ConfigError::ValidationError("Buffer capacity must be positive".to_string()));
        }

        Ok(())
    }
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(toml::de::Error),
    #[error("Serialize error: {0}")]
    SerializeError(toml::ser::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// 配置管理器
pub struct ConfigManager {
    config: AppConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// 创建配置管理器
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            config_path: None,
        }
    }

    /// 从文件加载配置
    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let config = AppConfig::load_from_file(&path)?;
        Ok(Self {
            config,
            config_path: Some(path.as_ref().to_path_buf()),
        })
    }

    /// 加载配置文件，文件不存在时写入默认配置，无效时使用默认值
    pub fn load_or_default<P: AsRef<std::path::Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("No config file at {}, writing defaults", path.display());
            let mut manager = Self::new();
            match manager.config.save_to_file(path) {
                Ok(()) => manager.config_path = Some(path.to_path_buf()),
                Err(e) => log::warn!("Failed to write default config: {}", e),
            }
            return manager;
        }

        match Self::load_from_file(path) {
            Ok(manager) => {
                log::info!("Loaded config from {}", path.display());
                manager
            }
            Err(e) => {
                log::error!("Failed to load config from {}: {}; using defaults", path.display(), e);
                Self::new()
            }
        }
    }

    /// 获取当前配置
    pub fn get_config(&self) -> &AppConfig {
        &self.config
    }

    pub fn config_path(&self) -> Option<&std::path::Path> {
        self.config_path.as_deref()
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
