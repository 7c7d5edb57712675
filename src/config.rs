//! Static tunables for the pipeline.
//!
//! Every knob in this struct can be overridden via environment variable
//! through [`Config::init_from_env`]; [`Config::default`] reproduces the
//! literal defaults from the pipeline's external-interface contract.

use envconfig::Envconfig;

#[derive(Envconfig, Debug, Clone, PartialEq)]
pub struct Config {
    #[envconfig(default = "10")]
    pub dedupe_window_minutes: i64,

    #[envconfig(default = "0.9")]
    pub text_similarity_threshold: f64,

    #[envconfig(default = "10")]
    pub frequency_window_minutes: i64,

    #[envconfig(default = "5")]
    pub frequency_limit: u32,

    #[envconfig(default = "30")]
    pub history_buffer_size: usize,

    #[envconfig(default = "2")]
    pub noise_limit_max_urgent: u32,

    #[envconfig(default = "15")]
    pub noise_limit_window_minutes: i64,

    #[envconfig(default = "22")]
    pub quiet_hour_start: u32,

    #[envconfig(default = "6")]
    pub quiet_hour_end: u32,

    #[envconfig(default = "8")]
    pub quiet_resume_hour: u32,

    #[envconfig(default = "5")]
    pub base_backoff_minutes: i64,

    #[envconfig(default = "9")]
    pub default_working_hour: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            dedupe_window_minutes: 10,
            text_similarity_threshold: 0.9,
            frequency_window_minutes: 10,
            frequency_limit: 5,
            history_buffer_size: 30,
            noise_limit_max_urgent: 2,
            noise_limit_window_minutes: 15,
            quiet_hour_start: 22,
            quiet_hour_end: 6,
            quiet_resume_hour: 8,
            base_backoff_minutes: 5,
            default_working_hour: 9,
        }
    }
}
