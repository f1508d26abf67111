//! Ad session example
//!
//! Drives a preroll through the bridge against the recording SDK and prints
//! every measurement call it produced.
//!
//! Run with: cargo run -p dmplayer-om --example ad_session

use std::sync::Arc;

use dmplayer_om::{
    AdEndReason, BridgeConfig, Error, OmBridge, PlayerEvent, PlayerState, RecordingSdk, StaticHostView,
};

fn main() {
    println!("dmplayer-om - Ad Session Example");
    println!("================================\n");

    let sdk = RecordingSdk::new();
    let mut bridge = OmBridge::new(sdk.clone(), BridgeConfig::default());
    if let Err(e) = bridge.ensure_initialized() {
        eprintln!("Measurement SDK unavailable: {}", e);
        return;
    }
    println!("Measurement SDK: {}\n", bridge.sdk_version());

    bridge.set_error_listener(Some(Arc::new(
        |description: &str, error: &Error, _debug: Option<&str>| {
            println!("  ! {} [{}] {}", description, error.error_code(), error);
        },
    )));
    bridge.set_player_state(Some(PlayerState::Normal));

    let view = StaticHostView::new("player-webview", "/* omid service script */");
    let payload = "verificationScripts[0][vendor]=iabtechlab.com-omid\
        &verificationScripts[0][resource]=https://verify.example.com/omid-validation.js\
        &verificationScripts[0][parameters]=adId%3D42";

    let mut events = vec![
        PlayerEvent::AdLoaded {
            payload: Some(payload.to_string()),
            position: Some("preroll".to_string()),
            skip_offset: 5.0,
            auto_play: true,
        },
        PlayerEvent::AdStart { ad_duration: 20.0 },
    ];
    for second in 0..=20 {
        events.push(PlayerEvent::AdTimeUpdate {
            time: Some(second.to_string()),
        });
        if second == 8 {
            events.push(PlayerEvent::AdPause);
            events.push(PlayerEvent::AdPlay);
        }
    }
    events.push(PlayerEvent::AdEnd {
        reason: AdEndReason::Stopped,
        error: None,
    });

    println!("Player events:");
    for event in &events {
        println!("  > {}", event.name());
        bridge.on_player_event(&view, event);
    }
    println!();

    println!("Measurement calls:");
    for record in sdk.calls() {
        println!("  {:>3} {}", record.sequence, record.call.name());
    }
}
