//! Headless panel walkthrough
//!
//! Mounts a panel over an in-memory history, edits a few fields, locks one,
//! regenerates the rest and steps back through history, printing the query
//! string after each step.
//!
//! ```text
//! RUST_LOG=sketch_params=debug cargo run --example headless_panel
//! ```

use sketch_params::prelude::*;
use std::cell::Cell;
use std::rc::Rc;
use tracing::info;
use web_time::Instant;

fn main() -> Result<(), ParamsError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let definitions = definitions_from_json(
        r#"{
            "number": { "type": "int", "label": "Random number" },
            "palette": { "type": "select", "label": "Palette", "options": ["Black & White", "Ice"] },
            "background": { "type": "color", "label": "Background" }
        }"#,
    )?;

    let mut sketch = SketchHost::new(
        Rng::from_seed(2024),
        &definitions,
        InMemoryStorage::new(),
        MemoryHistory::new("?number=0.5"),
        PanelConfig::default(),
    )?;

    let redraws = Rc::new(Cell::new(0));
    let counter = Rc::clone(&redraws);
    sketch.on_update(move |_| counter.set(counter.get() + 1));

    print_step("mounted", &sketch);

    let now = Instant::now();
    sketch.edit("number", "0.125", now)?;
    print_step("edited number", &sketch);

    sketch.edit_color_hex("background", "#1e90ff", now)?;
    sketch.poll(now + PanelConfig::default().throttle());
    print_step("edited background", &sketch);

    sketch.toggle_lock("number")?;
    sketch.handle_key(&KeyInput::new(" ", "Space"))?;
    print_step("space with number locked", &sketch);

    sketch.handle_key(&KeyInput::new("z", "KeyZ").with_ctrl())?;
    print_step("undo", &sketch);

    for field in sketch.fields() {
        info!(
            key = field.key.as_str(),
            label = field.label.as_str(),
            display = field.display.as_str(),
            locked = field.locked,
            "field"
        );
    }
    info!(redraws = redraws.get(), "done");

    Ok(())
}

fn print_step<R, S, H>(step: &str, sketch: &SketchHost<R, S, H>)
where
    R: RandomSource,
    S: Storage,
    H: History,
{
    println!("{:<28} ?{}", step, sketch.history().query());
}
