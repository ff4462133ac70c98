#![forbid(unsafe_code)]

//! JS-facing `CueTips` class.
//!
//! ```js
//! const cues = new CueTips(
//!   [{ cueAttr: "data-cue-save", cueTipAttr: "data-tip-save" }],
//!   { showCueTip(config, el) { /* ... */ } },
//!   (config) => config.cueAttr !== "data-keep",
//! );
//! cues.add({ cueAttr: "data-cue-export" });
//! cues.stop();
//! ```

use std::rc::Rc;

use cuetips_core::{CueTips as Engine, CueTipsError, CueTipsOptions, registry};
use js_sys::Function;
use tracing::debug;
use wasm_bindgen::prelude::*;

use crate::document::WebDocument;
use crate::interop::{ConfigTable, JsOnRemove, JsTipInterface};

/// `undefined` and `null` mean defaults.
fn options_from_js(options: &JsValue) -> Result<CueTipsOptions, CueTipsError> {
    if options.is_undefined() || options.is_null() {
        return Ok(CueTipsOptions::default());
    }
    let text = js_sys::JSON::stringify(options)
        .ok()
        .and_then(|s| s.as_string())
        .ok_or_else(|| CueTipsError::Options("options must be a plain object".to_string()))?;
    CueTipsOptions::from_json_str(&text)
}

/// A running instance bound to the page document.
#[wasm_bindgen]
pub struct CueTips {
    engine: Engine<WebDocument>,
    configs: Rc<ConfigTable>,
}

#[wasm_bindgen]
impl CueTips {
    /// `new CueTips(configs, tipInterface, onRemove?, options?)`
    #[wasm_bindgen(constructor)]
    pub fn new(
        configs: JsValue,
        tip_interface: JsValue,
        on_remove: Option<Function>,
        options: JsValue,
    ) -> Result<CueTips, JsError> {
        let document = WebDocument::from_window()
            .ok_or_else(|| JsError::new("cue-tips: no document available"))?;
        let table = ConfigTable::new();
        let list = table.intern_list(&configs)?;
        let tips = JsTipInterface::from_js(tip_interface, Rc::clone(&table))?;
        let options = options_from_js(&options)?;

        let mut builder = Engine::builder(document).options(options).tip_interface(tips);
        if let Some(hook) = on_remove {
            let hook = JsOnRemove::new(hook, Rc::clone(&table));
            builder = builder.on_remove(move |config| hook.call(config));
        }
        let engine = builder.build(list)?;
        table.retain_active(&engine.active_configs());
        debug!(configs = table.len(), "cue-tips bound to page");
        Ok(Self {
            engine,
            configs: table,
        })
    }

    /// Register another config object. Re-adding an active object is a no-op.
    pub fn add(&self, config: JsValue) -> Result<(), JsError> {
        self.prune();
        let config = self.configs.intern(&config)?;
        let result = self.engine.add(config);
        self.prune();
        result.map_err(JsError::from)
    }

    /// Retire a config object now, subject to `onRemove`.
    pub fn remove(&self, config: JsValue) {
        if let Some(config) = self.configs.lookup(&config) {
            self.engine.remove(&config);
        }
        self.prune();
    }

    pub fn stop(&self) {
        self.engine.stop();
    }

    #[wasm_bindgen(getter, js_name = isWatching)]
    pub fn is_watching(&self) -> bool {
        self.engine.is_watching()
    }

    /// Combined attribute selector of the active configs.
    #[wasm_bindgen(getter)]
    pub fn selector(&self) -> String {
        self.engine.selector()
    }

    /// Tracked attribute names, in config order.
    #[wasm_bindgen(getter)]
    pub fn attributes(&self) -> Vec<String> {
        self.engine.attributes()
    }

    fn prune(&self) {
        self.configs.retain_active(&self.engine.active_configs());
    }
}

/// Disconnect every live subscription on this thread. Returns the count.
#[wasm_bindgen(js_name = disconnectAll)]
pub fn disconnect_all() -> u32 {
    u32::try_from(registry::disconnect_all()).unwrap_or(u32::MAX)
}
