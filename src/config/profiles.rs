//! Built-in processing presets

use crate::config::ProcessingConfig;

/// Predefined processing profiles for common use cases
pub struct Profiles;

impl Profiles {
    pub const STANDARD: &'static str = "standard";
    pub const DISCORD: &'static str = "discord";

    /// Conservative defaults: small batches, a single worker
    pub fn standard() -> ProcessingConfig {
        ProcessingConfig {
            batch_size: 5,
            step_of_compression: 0.1,
            destination_folder_name: "Compressed".to_string(),
            max_degree_of_parallelism: 1,
        }
    }

    /// Larger batches and four workers, output named for Discord uploads
    pub fn discord() -> ProcessingConfig {
        ProcessingConfig {
            batch_size: 30,
            step_of_compression: 0.1,
            destination_folder_name: "Discord formatted".to_string(),
            max_degree_of_parallelism: 4,
        }
    }

    /// Look up a built-in profile by name
    pub fn by_name(name: &str) -> Option<ProcessingConfig> {
        match name {
            Self::STANDARD => Some(Self::standard()),
            Self::DISCORD => Some(Self::discord()),
            _ => None,
        }
    }

    /// Names and one-line descriptions of the built-in profiles
    pub fn describe() -> &'static [(&'static str, &'static str)] {
        &[
            (Self::STANDARD, "Batches of 5, 1 worker, output to \"Compressed\""),
            (Self::DISCORD, "Batches of 30, 4 workers, output to \"Discord formatted\""),
        ]
    }
}

impl ProcessingConfig {
    /// Set the batch size
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the compression step
    pub fn step(mut self, step: f32) -> Self {
        self.step_of_compression = step;
        self
    }

    /// Set the destination folder name
    pub fn destination<S: Into<String>>(mut self, name: S) -> Self {
        self.destination_folder_name = name.into();
        self
    }

    /// Set the number of worker threads
    pub fn parallelism(mut self, workers: usize) -> Self {
        self.max_degree_of_parallelism = workers;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_profiles_are_valid() {
        for (name, _) in Profiles::describe() {
            let profile = Profiles::by_name(name).unwrap();
            assert!(profile.validate().is_ok(), "profile {} should validate", name);
        }
    }

    #[test]
    fn test_discord_profile() {
        let profile = Profiles::discord();
        assert_eq!(profile.batch_size, 30);
        assert_eq!(profile.max_degree_of_parallelism, 4);
        assert_eq!(profile.destination_folder_name, "Discord formatted");
    }

    #[test]
    fn test_unknown_profile() {
        assert!(Profiles::by_name("print").is_none());
    }

    #[test]
    fn test_builder_methods() {
        let settings = Profiles::standard()
            .batch_size(2)
            .step(0.5)
            .destination("Out")
            .parallelism(3);

        assert_eq!(settings.batch_size, 2);
        assert_eq!(settings.step_of_compression, 0.5);
        assert_eq!(settings.destination_folder_name, "Out");
        assert_eq!(settings.max_degree_of_parallelism, 3);
    }
}
