mod support;

use support::gridsurv_env::GridsurvEnvGuard;

use gridsurv::app_dirs::APP_DIR_NAME;
use gridsurv::settings::{self, CONFIG_FILE_NAME};

#[test]
fn first_load_writes_defaults_under_config_home() {
    let temp = tempfile::tempdir().expect("create tempdir");
    let _env = GridsurvEnvGuard::set_config_home(temp.path().to_path_buf());

    let loaded = settings::load_or_default().expect("load settings");
    assert_eq!(loaded, settings::AppSettings::default());

    let path = temp.path().join(APP_DIR_NAME).join(CONFIG_FILE_NAME);
    assert_eq!(settings::config_path().expect("config path"), path);
    let text = std::fs::read_to_string(&path).expect("read written config");
    assert!(text.contains("[data]"));
    assert!(text.contains("synthetic_size = 120"));
}

#[test]
fn edited_config_is_picked_up() {
    let temp = tempfile::tempdir().expect("create tempdir");
    let _env = GridsurvEnvGuard::set_config_home(temp.path().to_path_buf());

    let path = settings::config_path().expect("config path");
    std::fs::write(
        &path,
        "[data]\nregenerate_size = 200\nseed = 3\n\n[view]\ndefault_grouping = \"category\"\n",
    )
    .expect("write config");

    let loaded = settings::load_or_default().expect("load settings");
    assert_eq!(loaded.data.regenerate_size, 200);
    assert_eq!(loaded.data.seed, Some(3));
    assert_eq!(loaded.view.default_grouping, "category");
}
