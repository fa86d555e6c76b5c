use anyhow::{anyhow, Result};
use glfw::{Action, Context, Key, WindowEvent};
use log::{debug, info};

use super::r#trait::WindowEngine;
use crate::graphics_backend::{Dimensions, GlfwSurface};
use crate::surface_lifecycle::SurfaceEvent;

pub type WindowEvents = glfw::GlfwReceiver<(f64, WindowEvent)>;

/// Fenêtre GLFW dont le contexte GL est cédé au thread de rendu.
///
/// La fenêtre et la boucle d'événements restent sur le thread principal ;
/// seul le `PRenderContext` part vers le contrôleur.
pub struct GlfwWindowEngine {
    glfw: glfw::Glfw,
    window: glfw::PWindow,
    events: WindowEvents,
    surface_pending: bool,
    surface_live: bool,
}

impl WindowEngine for GlfwWindowEngine {
    type Surface = GlfwSurface;

    fn init(width: u32, height: u32, title: &str) -> Result<Self> {
        let mut glfw = glfw::init(glfw::fail_on_errors)
            .map_err(|_| anyhow!("Impossible d'initialiser GLFW"))?;

        glfw.window_hint(glfw::WindowHint::ContextVersionMajor(3));
        glfw.window_hint(glfw::WindowHint::ContextVersionMinor(3));
        glfw.window_hint(glfw::WindowHint::OpenGlProfile(
            glfw::OpenGlProfileHint::Core,
        ));

        let (mut window, events) = glfw
            .create_window(width, height, title, glfw::WindowMode::Windowed)
            .ok_or_else(|| anyhow!("Erreur création fenêtre GLFW"))?;

        window.set_key_polling(true);
        window.set_framebuffer_size_polling(true);
        center_on_primary_monitor(&mut glfw, &mut window);

        // Les pointeurs GL sont chargés une fois, contexte courant ici, puis
        // le contexte est relâché pour pouvoir changer de thread
        window.make_current();
        gl::load_with(|s| window.get_proc_address(s) as *const _);
        glfw::make_context_current(None);
        info!("✅ Window '{}' ready ({}x{})", title, width, height);

        Ok(Self {
            glfw,
            window,
            events,
            surface_pending: true,
            surface_live: false,
        })
    }

    fn poll_surface_events(&mut self) -> Vec<SurfaceEvent<GlfwSurface>> {
        self.glfw.poll_events();
        let mut out = Vec::new();

        if self.surface_pending && !self.window.should_close() {
            self.surface_pending = false;
            self.surface_live = true;
            out.push(SurfaceEvent::Created {
                surface: GlfwSurface::new(self.window.render_context()),
                size: self.framebuffer_size(),
            });
        }

        for (_, event) in glfw::flush_messages(&self.events) {
            match event {
                WindowEvent::FramebufferSize(w, h) if self.surface_live => {
                    debug!("Framebuffer resized to {w}x{h}");
                    out.push(SurfaceEvent::Changed {
                        size: Dimensions::new(w.max(0) as u32, h.max(0) as u32),
                    });
                }
                WindowEvent::Key(Key::Escape, _, Action::Press, _) => {
                    self.window.set_should_close(true);
                }
                _ => {}
            }
        }

        if self.window.should_close() && self.surface_live {
            self.surface_live = false;
            out.push(SurfaceEvent::Destroyed);
        }
        out
    }

    fn request_new_surface(&mut self) {
        self.surface_pending = true;
        self.surface_live = false;
    }

    fn should_close(&self) -> bool {
        self.window.should_close()
    }

    fn set_should_close(&mut self, value: bool) {
        self.window.set_should_close(value);
    }

    fn framebuffer_size(&self) -> Dimensions {
        let (w, h) = self.window.get_framebuffer_size();
        Dimensions::new(w.max(0) as u32, h.max(0) as u32)
    }

    fn elapsed_seconds(&self) -> f64 {
        self.glfw.get_time()
    }
}

fn center_on_primary_monitor(glfw: &mut glfw::Glfw, window: &mut glfw::Window) {
    glfw.with_primary_monitor(|_, monitor| {
        let Some(monitor) = monitor else { return };
        if let Some(mode) = monitor.get_video_mode() {
            let (monitor_x, monitor_y) = monitor.get_pos();
            let (window_w, window_h) = window.get_size();
            window.set_pos(
                monitor_x + (mode.width as i32 - window_w) / 2,
                monitor_y + (mode.height as i32 - window_h) / 2,
            );
        }
    });
}
