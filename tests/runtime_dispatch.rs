
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;

use harness::{desktop, entries, log, settle, Log, Recorder};
use tape_desktop::core::input_event::{Command, InputEvent};
use tape_desktop::{AppHandle, DesktopError, Window, WindowFlags, WindowHandler};

fn mouse_bytes(code: u32, x: u32, y: u32) -> String {
    let report: String = [32 + code, 33 + x, 33 + y]
        .into_iter()
        .map(|cp| char::from_u32(cp).expect("codepoint"))
        .collect();
    format!("\x1b[M{report}")
}

#[test]
fn keypresses_reach_the_active_window() {
    let (mut app, terminal) = desktop(80, 24);
    let log = log();
    let handle = app.handle();
    handle.add_window(
        Window::new("below", 0, 1, 20, 8),
        Recorder {
            name: "below",
            log: Arc::clone(&log),
        },
    );
    handle.add_window(
        Window::new("top", 30, 1, 20, 8),
        Recorder {
            name: "top",
            log: Arc::clone(&log),
        },
    );

    terminal.type_text("hi\x1b[A");
    settle(&mut app);

    assert_eq!(entries(&log), vec!["top:h", "top:i", "top:up"]);
}

#[test]
fn f6_accelerator_switches_windows() {
    let (mut app, terminal) = desktop(80, 24);
    let handle = app.handle();
    handle.add_window_menu().expect("window menu");
    let first = handle.add_window(
        Window::new("one", 0, 1, 20, 8),
        Recorder {
            name: "one",
            log: log(),
        },
    );
    let second = handle.add_window(
        Window::new("two", 30, 1, 20, 8),
        Recorder {
            name: "two",
            log: log(),
        },
    );
    assert_eq!(handle.active_window(), Some(second));

    terminal.type_text("\x1b[17~");
    settle(&mut app);
    assert_eq!(handle.active_window(), Some(first));

    terminal.type_text("\x1b[17;2~");
    settle(&mut app);
    assert_eq!(handle.active_window(), Some(second));
}

#[test]
fn clicking_a_menu_item_dispatches_it() {
    let (mut app, terminal) = desktop(80, 24);
    let handle = app.handle();
    handle.add_file_menu().expect("file menu");
    settle(&mut app);

    terminal.type_text(&mouse_bytes(0, 2, 0));
    settle(&mut app);
    let frame = app.backend().logical_screen();
    assert!(frame.row_text(2).starts_with("│ Exit"), "{}", frame.row_text(2));

    terminal.type_text(&mouse_bytes(3, 2, 2));
    settle(&mut app);
    assert!(handle.is_quitting());
}

#[test]
fn alt_mnemonic_opens_a_menu_and_letters_choose_items() {
    let (mut app, terminal) = desktop(80, 24);
    let handle = app.handle();
    handle.add_file_menu().expect("file menu");

    terminal.type_text("\x1bf");
    settle(&mut app);
    assert!(!handle.is_quitting());

    terminal.type_text("x");
    settle(&mut app);
    assert!(handle.is_quitting());
}

#[test]
fn menu_hook_sees_application_items() {
    const HELLO: tape_desktop::MenuItemId = tape_desktop::MenuItemId(2048);

    let (mut app, terminal) = desktop(80, 24);
    let handle = app.handle();
    let menu = handle.add_menu("&Greet");
    handle
        .add_menu_item(menu, HELLO, "&Hello", Some(tape_desktop::Keypress::ch('h').ctrl()))
        .expect("item");
    let seen = log();
    let hook_log = Arc::clone(&seen);
    handle.set_menu_hook(move |id, _app| {
        hook_log.lock().expect("log").push(format!("menu:{}", id.0));
        true
    });

    terminal.type_text("\x08");
    settle(&mut app);
    assert_eq!(entries(&seen), vec!["menu:2048"]);
}

struct Opener {
    log: Log,
}

impl WindowHandler for Opener {
    fn handle_event(&mut self, event: &InputEvent, app: &AppHandle) {
        let InputEvent::Keypress(key) = event else {
            return;
        };
        self.log
            .lock()
            .expect("log")
            .push(format!("opener:{}", key.key_id()));
        if key.char() == Some('m') {
            let dialog = Dialog {
                log: Arc::clone(&self.log),
            };
            let window = Window::new("dialog", 0, 0, 20, 6)
                .with_flags(WindowFlags::MODAL | WindowFlags::CENTERED);
            app.run_modal(window, dialog).expect("modal");
            self.log.lock().expect("log").push("opener:returned".to_string());
        }
    }
}

struct Dialog {
    log: Log,
}

impl WindowHandler for Dialog {
    fn handle_event(&mut self, event: &InputEvent, app: &AppHandle) {
        let InputEvent::Keypress(key) = event else {
            return;
        };
        self.log
            .lock()
            .expect("log")
            .push(format!("dialog:{}", key.key_id()));
        if key.char() == Some('q') {
            if let Some(id) = app.active_window() {
                app.close_window(id);
            }
        }
    }
}

#[test]
fn modal_window_runs_on_the_secondary_consumer_until_closed() {
    let (mut app, terminal) = desktop(80, 24);
    let handle = app.handle();
    let log = log();
    handle.add_window(
        Window::new("main", 0, 1, 40, 12),
        Opener {
            log: Arc::clone(&log),
        },
    );

    terminal.type_text("m");
    settle(&mut app);
    assert_eq!(handle.windows().len(), 2);
    let dialog = handle.windows().into_iter().find(|window| window.is_modal());
    let dialog = dialog.expect("modal window");
    assert_eq!((dialog.x, dialog.y), (30, 9));

    terminal.type_text("ab");
    settle(&mut app);
    terminal.type_text("q");
    settle(&mut app);
    terminal.type_text("z");
    settle(&mut app);

    assert_eq!(
        entries(&log),
        vec![
            "opener:m",
            "dialog:a",
            "dialog:b",
            "dialog:q",
            "opener:returned",
            "opener:z"
        ]
    );
    assert_eq!(handle.windows().len(), 1);
}

#[test]
fn yielding_outside_the_primary_consumer_is_rejected() {
    let (app, _terminal) = desktop(80, 24);
    let handle = app.handle();
    assert!(matches!(
        handle.yield_to_secondary(),
        Err(DesktopError::NotPrimaryConsumer)
    ));
    assert!(matches!(
        handle.run_modal(Window::new("x", 0, 1, 10, 4), Recorder {
            name: "x",
            log: log(),
        }),
        Err(DesktopError::NotPrimaryConsumer)
    ));
}

#[test]
fn timers_fire_on_the_run_loop() {
    let (mut app, _terminal) = desktop(40, 12);
    let handle = app.handle();
    let fired = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&fired);
    handle.add_timer(Duration::ZERO, false, move |app| {
        *counter.lock().expect("counter") += 1;
        app.set_status_text(Some("tick".to_string()));
    });

    settle(&mut app);
    app.run_once();
    assert_eq!(*fired.lock().expect("counter"), 1);
    assert!(app
        .backend()
        .logical_screen()
        .row_text(11)
        .starts_with(" tick"));
}

#[test]
fn abort_stops_the_loop_and_restores_the_terminal() {
    let (mut app, terminal) = desktop(80, 24);
    let handle = app.handle();
    handle.post_event(InputEvent::Command(Command::Abort));
    app.run().expect("run");

    assert!(handle.is_quitting());
    assert!(terminal.is_stopped());
    let output = terminal.take_output();
    assert!(output.contains("\x1b[?1003;1005l\x1b[?1049l"));
    assert!(output.ends_with("\x1b[0;37;40m"));
}
