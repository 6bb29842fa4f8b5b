/// Platform-native logging initialization.
///
/// - Android: paranoid-android → logcat
/// - Tests / desktop: tracing-subscriber::fmt → stderr
///
/// Called once at the start of `PushHandler::new()`, before anything else.
pub fn init_logging(#[allow(unused)] data_dir: &str) {
    #[cfg(target_os = "android")]
    {
        use tracing_subscriber::prelude::*;

        let android_layer = paranoid_android::layer("push_core")
            .with_filter(tracing_subscriber::EnvFilter::new("push_core=debug,info"));

        let _ = tracing_subscriber::registry()
            .with(android_layer)
            .try_init();
    }

    #[cfg(not(target_os = "android"))]
    {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "push_core=debug,info".into()),
            )
            .try_init();
    }
}
