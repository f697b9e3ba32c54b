//! Built-in base plugin
//!
//! Draws a title row, then one resizable row per configured plugin and
//! sub-renders that plugin into it. A plugin that cannot render (no module
//! and no remote attached) gets a placeholder line instead.

use gridwell_bridge::exports;
use gridwell_bridge::{CallResult, ExportSignature, HostCalls, HostCallsExt, PluginModule};
use gridwell_core::{GridRect, Rect, TypedArg};
use serde::{Deserialize, Serialize};

use crate::settings::STATUS_PLUGIN;

/// Wide enough to span any div; painting is clipped to the div.
const SPAN: f32 = 4096.0;

const TEXT_SIZE: f32 = 14.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Palette {
    header: u32,
    text: u32,
    muted: u32,
}

impl Palette {
    fn for_theme(theme: &str) -> Self {
        match theme {
            "light" => Self {
                header: 0xe8e8e8ff,
                text: 0x202020ff,
                muted: 0x909090ff,
            },
            _ => Self {
                header: 0x2a2a2eff,
                text: 0xe0e0e0ff,
                muted: 0x7a7a80ff,
            },
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct StatusState {
    renders: u64,
}

pub struct StatusModule {
    plugins: Vec<String>,
    palette: Palette,
    state: StatusState,
}

impl StatusModule {
    pub fn new(plugins: Vec<String>, theme: &str) -> Self {
        Self {
            plugins,
            palette: Palette::for_theme(theme),
            state: StatusState::default(),
        }
    }

    pub fn renders(&self) -> u64 {
        self.state.renders
    }

    fn render(&mut self, host: &mut dyn HostCalls) -> CallResult<Option<TypedArg>> {
        host.div_col(0, 1.0, SPAN, "")?;
        host.div_row(0, 1.0, 1.0, "")?;
        for (i, name) in self.plugins.iter().enumerate() {
            host.div_row(i as i64 + 1, 1.0, SPAN, &format!("status.row.{name}"))?;
        }

        host.div_start("header", GridRect::new(0, 0, 1, 1))?;
        host.paint_rect(Rect::new(0.0, 0.0, SPAN, 1.0), self.palette.header, 0.0)?;
        let title = host.translate("status.title")?;
        host.paint_text(
            Rect::new(0.25, 0.0, SPAN, 1.0),
            &title,
            self.palette.text,
            TEXT_SIZE,
            0,
        )?;
        host.div_end()?;

        for (i, name) in self.plugins.iter().enumerate() {
            host.div_start(name, GridRect::new(0, i as i32 + 1, 1, 1))?;
            if !host.sub_render(name)? {
                let text = format!("{name}: {}", host.translate("status.offline")?);
                host.paint_text(
                    Rect::new(0.25, 0.0, SPAN, 1.0),
                    &text,
                    self.palette.muted,
                    TEXT_SIZE,
                    0,
                )?;
            }
            host.div_end()?;
        }

        self.state.renders += 1;
        Ok(Some(TypedArg::Int64(0)))
    }
}

impl PluginModule for StatusModule {
    fn identity(&self) -> &str {
        STATUS_PLUGIN
    }

    fn exports(&self) -> Vec<ExportSignature> {
        exports::standard()
    }

    fn call(
        &mut self,
        host: &mut dyn HostCalls,
        function: &str,
        args: Vec<TypedArg>,
    ) -> CallResult<Option<TypedArg>> {
        match function {
            exports::RENDER => self.render(host),
            exports::OPEN => {
                let bytes = args.first().and_then(TypedArg::as_bytes).unwrap_or_default();
                self.state = serde_json::from_slice(bytes).unwrap_or_default();
                Ok(Some(TypedArg::Int64(1)))
            }
            exports::SAVE => {
                let bytes = serde_json::to_vec(&self.state).unwrap_or_default();
                host.set_return(&bytes)?;
                Ok(Some(TypedArg::Int64(1)))
            }
            exports::INFO => {
                host.set_return(STATUS_PLUGIN.as_bytes())?;
                Ok(None)
            }
            _ => Ok(None),
        }
    }
}
