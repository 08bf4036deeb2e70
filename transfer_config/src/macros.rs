/// Declares the typed settings of one configuration group, each with its default.
///
/// ```rust
/// use transfer_config::config_group;
///
/// config_group!({
///     ref TEST_INT: usize = 42;
///     ref TEST_STRING: String = "default".to_string();
/// });
/// ```
///
/// Expands to a `ConfigValueGroup` with one public field per entry.  A fresh group carries the
/// declared defaults; `apply_env_overrides()` reads `TRANSFER_{GROUP}_{FIELD}`, taking the group
/// name from the last segment of the calling module's path.
#[macro_export]
macro_rules! config_group {
    ({
        $(
            $(#[$meta:meta])*
            ref $name:ident : $type:ty = $value:expr;
        )+
    }) => {
        #[allow(unused_imports)]
        use $crate::ParsableConfigValue;

        /// Settings of this group, one field per declared value.
        #[derive(Debug, Clone)]
        pub struct ConfigValueGroup {
            $(
                $(#[$meta])*
                #[allow(non_snake_case)]
                pub $name: $type,
            )+
        }

        impl Default for ConfigValueGroup {
            /// The declared defaults, ignoring the environment.
            fn default() -> Self {
                Self {
                    $(
                        $name: {
                            let v: $type = $value;
                            v
                        },
                    )+
                }
            }
        }

        impl ConfigValueGroup {
            /// Same as `default()`; call `apply_env_overrides` to pick up the environment.
            pub fn new() -> Self {
                Self::default()
            }

            /// Environment variable prefix for this group, e.g. `TRANSFER_SPARSE_CACHE_`.
            pub fn env_prefix() -> String {
                let group_name = module_path!().split("::").last().unwrap_or("unknown");
                format!("TRANSFER_{}_", group_name.to_uppercase())
            }

            /// Replaces each field with its parsed environment value, if one is set.  Unparsable
            /// values fall back to the declared default.
            pub fn apply_env_overrides(&mut self) {
                let prefix = Self::env_prefix();

                $(
                    let env_var_name = format!("{prefix}{}", stringify!($name).to_uppercase());
                    let maybe_env_value = std::env::var(&env_var_name).ok();
                    let default_value: $type = $value;
                    self.$name = <$type>::parse(&env_var_name, maybe_env_value, default_value);
                )+
            }
        }
    };
}
