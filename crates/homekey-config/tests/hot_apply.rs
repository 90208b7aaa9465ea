//! Configuration engine driven against live workers and a memory store.
//!
//! Run with: cargo test --package homekey-config --test hot_apply

use homekey_actuation::{Actuators, Peripherals, WorkerKind, WorkerSettings};
use homekey_config::{ApplyOutcome, ConfigEngine, ConfigError, ConfigRequest, Section};
use homekey_core::constants::CONFIG_DATA_KEY;
use homekey_core::{Configuration, PinDirection, Rgb, config_channel};
use homekey_hardware::PairedController;
use homekey_hardware::mock::{
    MockAccessory, MockAccessoryHandle, MockGpio, MockGpioHandle, MockPixel,
};
use homekey_reader::IdentityService;
use homekey_storage::{AnyBlobStore, ConfigRepository, MemoryBlobStore, ReaderDataRepository};
use serde_json::{Value, json};
use std::sync::Arc;

const SUCCESS_PIN: u8 = 4;
const ACTION_PIN: u8 = 26;

struct Rig {
    engine: ConfigEngine,
    store: Arc<AnyBlobStore>,
    gpio: MockGpioHandle,
    accessory: MockAccessoryHandle,
}

impl Rig {
    fn memory(&self) -> &MemoryBlobStore {
        self.store.as_memory().expect("memory backend")
    }

    fn persisted(&self) -> Option<Configuration> {
        self.memory()
            .committed(CONFIG_DATA_KEY)
            .map(|bytes| serde_json::from_slice(&bytes).expect("decodable record"))
    }

    async fn apply(&mut self, section: Section, document: Value) -> Result<ApplyOutcome, ConfigError> {
        self.engine.apply_partial(section, &document).await
    }
}

async fn rig_with(config: Configuration) -> Rig {
    let (gpio, gpio_handle) = MockGpio::new();
    let (pixel, _) = MockPixel::new();
    let (accessory, accessory_handle) = MockAccessory::new();
    let accessory = Arc::new(accessory);
    let store = Arc::new(AnyBlobStore::Memory(MemoryBlobStore::new()));

    let (writer, reader) = config_channel(config);
    let peripherals = Peripherals {
        gpio: Arc::new(gpio),
        pixel: Arc::new(pixel),
        accessory: accessory.clone(),
    };
    let mut actuators = Actuators::new(peripherals, reader, WorkerSettings::default());
    actuators.boot().await;

    let identity =
        IdentityService::load(ReaderDataRepository::reader_data(store.clone()), accessory).await;
    let engine = ConfigEngine::new(
        writer,
        actuators,
        ConfigRepository::config(store.clone()),
        identity,
    );
    Rig {
        engine,
        store,
        gpio: gpio_handle,
        accessory: accessory_handle,
    }
}

async fn rig() -> Rig {
    rig_with(Configuration::default()).await
}

fn admin(id: &str) -> PairedController {
    PairedController {
        id: id.to_string(),
        ltpk: vec![7; 32],
        admin: true,
    }
}

#[tokio::test(start_paused = true)]
async fn test_rejected_batch_changes_nothing() {
    let mut rig = rig().await;

    let err = rig
        .apply(Section::Actions, json!({ "nfcSuccessPin": SUCCESS_PIN, "bogus": 1 }))
        .await
        .unwrap_err();

    assert!(matches!(err, ConfigError::UnknownField { ref field } if field == "bogus"));
    assert_eq!(rig.engine.snapshot(), Configuration::default());
    assert!(rig.persisted().is_none());
    assert!(!rig.engine.actuators().is_running(WorkerKind::Indicator));
    assert_eq!(rig.gpio.mode(SUCCESS_PIN), None);
}

#[tokio::test(start_paused = true)]
async fn test_fields_are_scoped_to_their_section() {
    let mut rig = rig().await;

    let err = rig
        .apply(Section::Misc, json!({ "nfcSuccessPin": SUCCESS_PIN }))
        .await
        .unwrap_err();
    assert!(matches!(err, ConfigError::UnknownField { .. }));

    let err = rig.apply(Section::HkInfo, json!({})).await.unwrap_err();
    assert!(matches!(err, ConfigError::ReadOnlySection(_)));

    let err = rig.apply(Section::Actions, json!([1, 2])).await.unwrap_err();
    assert!(matches!(err, ConfigError::NotAnObject));
}

#[tokio::test(start_paused = true)]
async fn test_numeric_booleans_are_coerced() {
    let mut rig = rig().await;

    let outcome = rig
        .apply(Section::Actions, json!({ "lockAlwaysLock": 1, "nfcSuccessHL": 0 }))
        .await
        .unwrap();

    assert_eq!(outcome, ApplyOutcome::Applied);
    let config = rig.engine.snapshot();
    assert!(config.lock_always_lock);
    assert!(!config.nfc_success_hl);
    let persisted = rig.persisted().unwrap();
    assert!(persisted.lock_always_lock);
    assert!(!persisted.nfc_success_hl);
}

#[tokio::test(start_paused = true)]
async fn test_pin_capability_is_checked() {
    let mut rig = rig().await;

    // input-only pin
    let err = rig
        .apply(Section::Actions, json!({ "nfcSuccessPin": 34 }))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "\"34\" is not a valid GPIO Pin for \"nfcSuccessPin\"");

    let err = rig
        .apply(Section::Actions, json!({ "nfcSuccessPin": 0 }))
        .await
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { .. }));

    rig.apply(Section::Actions, json!({ "hkAltActionInitPin": 34 }))
        .await
        .unwrap();
    assert_eq!(rig.gpio.mode(34), Some(PinDirection::Input));

    rig.apply(Section::Actions, json!({ "nfcSuccessPin": 255 }))
        .await
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_setup_code_reprograms_pairing() {
    let mut rig = rig().await;

    let outcome = rig
        .apply(Section::Misc, json!({ "setupCode": "12345678" }))
        .await
        .unwrap();

    assert_eq!(outcome, ApplyOutcome::Applied);
    assert_eq!(rig.accessory.pairing_codes(), vec!["12345678".to_string()]);
    assert_eq!(rig.engine.snapshot().setup_code, "12345678");
}

#[tokio::test(start_paused = true)]
async fn test_setup_code_locked_once_paired() {
    let mut rig = rig().await;
    rig.accessory.add_controller(admin("phone"));

    // even the current value is refused
    let err = rig
        .apply(Section::Misc, json!({ "setupCode": "46637726" }))
        .await
        .unwrap_err();

    assert!(matches!(err, ConfigError::SetupCodeLocked));
    assert!(rig.accessory.pairing_codes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_pixel_type_change_asks_for_restart() {
    let mut rig = rig().await;

    let unchanged = rig
        .apply(Section::Actions, json!({ "neoPixelType": 5 }))
        .await
        .unwrap();
    assert_eq!(unchanged, ApplyOutcome::Applied);

    let changed = rig
        .apply(Section::Actions, json!({ "neoPixelType": 2 }))
        .await
        .unwrap();
    assert_eq!(
        changed.message(),
        "Pixel Type was changed, reboot needed! Rebooting..."
    );
    assert_eq!(rig.persisted().unwrap().neo_pixel_type, 2);
}

#[tokio::test(start_paused = true)]
async fn test_restart_fields_report_restart() {
    let mut rig = rig().await;

    let outcome = rig
        .apply(Section::Misc, json!({ "deviceName": "Front Door", "webAuthEnabled": true }))
        .await
        .unwrap();

    assert!(outcome.restart_required());
    assert_eq!(outcome.message(), "Saved! Restarting...");

    for document in [
        json!({ "webUsername": "door" }),
        json!({ "webPassword": "hunter22" }),
        json!({ "webAuthEnabled": false }),
    ] {
        let outcome = rig.apply(Section::Misc, document.clone()).await.unwrap();
        assert!(outcome.restart_required(), "{} should restart", document);
    }
    let stored = rig.persisted().unwrap();
    assert_eq!(stored.web_username, "door");
    assert_eq!(stored.web_password, "hunter22");
    assert!(!stored.web_auth_enabled);

    // Rewriting the same values is not a change.
    let outcome = rig
        .apply(Section::Misc, json!({ "deviceName": "Front Door", "webUsername": "door" }))
        .await
        .unwrap();
    assert_eq!(outcome, ApplyOutcome::Applied);
}

#[tokio::test(start_paused = true)]
async fn test_pin_assignment_starts_and_stops_workers() {
    let mut rig = rig().await;

    rig.apply(Section::Actions, json!({ "nfcSuccessPin": SUCCESS_PIN }))
        .await
        .unwrap();
    assert!(rig.engine.actuators().is_running(WorkerKind::Indicator));
    assert_eq!(rig.gpio.mode(SUCCESS_PIN), Some(PinDirection::Output));

    rig.apply(Section::Actions, json!({ "nfcNeopixelPin": 16 }))
        .await
        .unwrap();
    assert!(rig.engine.actuators().is_running(WorkerKind::Pixel));

    rig.apply(Section::Actions, json!({ "nfcSuccessPin": 255, "nfcNeopixelPin": 255 }))
        .await
        .unwrap();
    assert!(rig.engine.actuators().running().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_action_pin_supersedes_dumb_switch_mode() {
    let mut rig = rig_with(Configuration {
        hk_dumb_switch_mode: true,
        ..Default::default()
    })
    .await;
    assert!(rig.engine.actuators().is_running(WorkerKind::Lock));

    rig.apply(Section::Actions, json!({ "gpioActionPin": ACTION_PIN }))
        .await
        .unwrap();

    let config = rig.engine.snapshot();
    assert_eq!(config.gpio_action_pin, ACTION_PIN);
    assert!(!config.hk_dumb_switch_mode);
    assert!(rig.engine.actuators().is_running(WorkerKind::Lock));
    assert_eq!(rig.gpio.mode(ACTION_PIN), Some(PinDirection::Output));

    rig.apply(Section::Actions, json!({ "gpioActionPin": 255 }))
        .await
        .unwrap();
    assert_eq!(rig.gpio.resets(), vec![ACTION_PIN]);
    assert!(!rig.engine.actuators().is_running(WorkerKind::Lock));
}

#[tokio::test(start_paused = true)]
async fn test_battery_threshold_reevaluates_low_flag() {
    let mut rig = rig().await;
    rig.accessory.set_battery_level(15);

    rig.apply(Section::Misc, json!({ "btrLowStatusThreshold": 20 }))
        .await
        .unwrap();
    assert!(rig.accessory.low_battery());

    rig.apply(Section::Misc, json!({ "btrLowStatusThreshold": 10 }))
        .await
        .unwrap();
    assert!(!rig.accessory.low_battery());
}

#[tokio::test(start_paused = true)]
async fn test_persistence_failure_keeps_memory_state() {
    let mut rig = rig().await;
    rig.memory().set_fail_commits(true);

    let err = rig
        .apply(Section::Actions, json!({ "nfcSuccessPin": SUCCESS_PIN }))
        .await
        .unwrap_err();

    assert!(matches!(err, ConfigError::Persistence(_)));
    assert!(!err.is_validation());
    assert_eq!(rig.engine.snapshot().nfc_success_pin, SUCCESS_PIN);
    assert!(rig.engine.actuators().is_running(WorkerKind::Indicator));
    assert!(rig.persisted().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_clear_restores_defaults() {
    let mut rig = rig().await;
    rig.apply(Section::Actions, json!({ "nfcSuccessPin": SUCCESS_PIN, "lockAlwaysLock": true }))
        .await
        .unwrap();
    assert!(rig.persisted().is_some());

    let report = rig.engine.clear(Section::Actions).await.unwrap();

    assert_eq!(report.stopped, vec![WorkerKind::Indicator]);
    assert_eq!(rig.engine.snapshot(), Configuration::default());
    assert!(rig.persisted().is_none());
    assert!(matches!(
        rig.engine.clear(Section::HkInfo).await,
        Err(ConfigError::ReadOnlySection(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_colours_accept_both_wire_shapes() {
    let mut rig = rig().await;

    rig.apply(
        Section::Actions,
        json!({
            "neopixelSuccessColor": [[0, 0], [1, 128], [2, 255]],
            "neopixelFailureColor": { "r": 200, "g": 10, "b": 0 },
        }),
    )
    .await
    .unwrap();

    let stored = rig.persisted().unwrap();
    assert_eq!(stored.neopixel_success_color, Rgb::new(0, 128, 255));
    assert_eq!(stored.neopixel_failure_color, Rgb::new(200, 10, 0));

    let actions = rig.engine.get(Section::Actions).await;
    assert_eq!(actions["neopixelSuccessColor"], json!({ "r": 0, "g": 128, "b": 255 }));
}

#[tokio::test(start_paused = true)]
async fn test_sections_read_back() {
    let mut rig = rig().await;
    rig.apply(Section::Actions, json!({ "nfcFailTime": 250 }))
        .await
        .unwrap();

    let actions = rig.engine.get(Section::Actions).await;
    assert_eq!(actions["nfcFailTime"], json!(250));
    assert_eq!(actions["setupCode"], json!("46637726"));

    let info = rig.engine.get(Section::HkInfo).await;
    assert_eq!(info["issuers"], json!([]));
    assert!(info.get("group_identifier").is_some());

    let ethernet = serde_json::to_value(rig.engine.ethernet_info()).unwrap();
    assert_eq!(ethernet["ethEnabled"], json!(false));
    assert_eq!(ethernet["boardPresets"].as_array().unwrap().len(), 6);
}

#[tokio::test(start_paused = true)]
async fn test_requests_map_to_status_codes() {
    let mut rig = rig().await;

    let saved = ConfigRequest::Save {
        section: "actions".into(),
        body: r#"{"nfcFailPin": 2, "nfcFailHL": 1}"#.into(),
    }
    .handle(&mut rig.engine)
    .await;
    assert_eq!((saved.status, saved.body.as_str()), (200, "Saved and applied!"));

    let invalid = ConfigRequest::Save {
        section: "actions".into(),
        body: r#"{"nfcFailPin": "2"}"#.into(),
    }
    .handle(&mut rig.engine)
    .await;
    assert_eq!(invalid.status, 400);
    assert_eq!(
        invalid.body,
        "\"nfcFailPin\" not of correct type or does not exist in config"
    );

    let garbage = ConfigRequest::Save {
        section: "misc".into(),
        body: "{not json".into(),
    }
    .handle(&mut rig.engine)
    .await;
    assert_eq!(garbage.status, 400);

    let unknown = ConfigRequest::Get {
        section: "mqtt".into(),
    }
    .handle(&mut rig.engine)
    .await;
    assert_eq!((unknown.status, unknown.body.as_str()), (400, ""));

    let read = ConfigRequest::Get {
        section: "misc".into(),
    }
    .handle(&mut rig.engine)
    .await;
    let body: Value = serde_json::from_str(&read.body).unwrap();
    assert_eq!(body["nfcFailPin"], json!(2));

    rig.memory().set_fail_commits(true);
    let failed = ConfigRequest::Save {
        section: "actions".into(),
        body: r#"{"nfcFailTime": 10}"#.into(),
    }
    .handle(&mut rig.engine)
    .await;
    assert_eq!(failed.status, 500);

    rig.memory().set_fail_commits(false);
    let cleared = ConfigRequest::Clear {
        section: "actions".into(),
    }
    .handle(&mut rig.engine)
    .await;
    assert_eq!((cleared.status, cleared.body.as_str()), (200, "200 Success"));
}
