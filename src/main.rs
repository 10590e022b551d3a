// main.rs — window, event loop, background loading and the egui overlay

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod renderer;

use clap::Parser;
use panorama_depth::asset::{load_panorama, LoadedPanorama, MeshSettings};
use panorama_depth::camera::{DisplayMode, InteractMode, Movement, NavigationContext};
use panorama_depth::config::{Cli, ViewerConfig};
use panorama_depth::error::LoadError;
use panorama_depth::mesh::GridResolution;
use panorama_depth::upload::MeshUpload;
use renderer::Renderer;

use winit::{
    dpi::LogicalSize,
    event::*,
    event_loop::{ControlFlow, EventLoop},
    window::{Fullscreen, WindowBuilder},
};

use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

type LoadResult = Result<LoadedPanorama, LoadError>;

const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

#[derive(Default)]
struct UiState {
    show_fps: bool,
    is_loading: bool,
    fps: f32,
    next_image: Option<PathBuf>,
    mesh_stats: Option<(usize, usize)>,
    mesh_grid: Option<GridResolution>,
    last_error: Option<String>,
    is_fullscreen: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let cfg = match cli.resolve() {
        Ok(cfg) => cfg,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(2);
        }
    };
    if let Err(e) = cfg.grid.validate() {
        log::error!("{e}");
        std::process::exit(2);
    }

    let event_loop = EventLoop::new();
    let window = match WindowBuilder::new()
        .with_title("Depth Panorama Viewer")
        .with_inner_size(LogicalSize::new(cfg.window_width, cfg.window_height))
        .build(&event_loop)
    {
        Ok(w) => Arc::new(w),
        Err(e) => {
            log::error!("cannot create window: {e}");
            std::process::exit(1);
        }
    };

    let mut renderer = match pollster::block_on(Renderer::new(window.clone(), cfg.vsync)) {
        Ok(r) => r,
        Err(e) => {
            log::error!("cannot initialise renderer: {e}");
            std::process::exit(1);
        }
    };
    let mut nav = NavigationContext::new(cfg.camera());
    let settings = cfg.mesh_settings();

    let mut ui = UiState::default();
    let mut last_frame_time = Instant::now();
    let mut frame_count = 0;

    let (tx, rx): (Sender<LoadResult>, Receiver<LoadResult>) = channel();
    if let Some(path) = cfg.input.clone() {
        ui.is_loading = true;
        start_load_image(path, settings, tx.clone());
    }

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;

        if let Ok(result) = rx.try_recv() {
            ui.is_loading = false;
            match result {
                Ok(loaded) => {
                    renderer.upload_panorama(&loaded.mesh, &loaded.textures());
                    ui.mesh_stats = Some((loaded.mesh.vertex_count(), loaded.mesh.triangle_count()));
                    ui.mesh_grid = loaded.mesh.grid;
                    ui.last_error = None;
                }
                Err(e) => {
                    log::error!("load failed: {e}");
                    ui.last_error = Some(e.to_string());
                }
            }
        }

        match event {
            Event::WindowEvent { event, .. } => {
                let response = renderer.egui_state.on_event(&renderer.egui_ctx, &event);
                if response.consumed {
                    // a release over the UI must still end movement and drags
                    apply_release(&mut nav, &event);
                    return;
                }

                match event {
                    WindowEvent::CloseRequested => {
                        *control_flow = ControlFlow::Exit;
                    }

                    WindowEvent::Resized(new_size) => {
                        renderer.resize(new_size);
                    }

                    WindowEvent::KeyboardInput { input, .. } => {
                        let pressed = input.state == ElementState::Pressed;
                        let Some(key) = input.virtual_keycode else {
                            return;
                        };
                        if let Some(movement) = movement_for(key) {
                            nav.set_held(movement, pressed);
                        } else if pressed {
                            match key {
                                VirtualKeyCode::Escape => *control_flow = ControlFlow::Exit,
                                VirtualKeyCode::Tab => nav.toggle_mode(),
                                VirtualKeyCode::V => nav.toggle_display(),
                                VirtualKeyCode::R => nav.reset(),
                                VirtualKeyCode::O => {
                                    if let Some(path) = pick_image() {
                                        ui.is_loading = true;
                                        start_load_image(path, settings, tx.clone());
                                    }
                                }
                                VirtualKeyCode::F11 => toggle_fullscreen(&window, &mut ui),
                                _ => {}
                            }
                        }
                    }

                    WindowEvent::MouseInput { state, button, .. } => {
                        if button == MouseButton::Left {
                            nav.set_dragging(state == ElementState::Pressed);
                        }
                    }

                    WindowEvent::CursorMoved { position, .. } => {
                        nav.cursor_moved(position.x, position.y);
                    }

                    WindowEvent::MouseWheel { delta, .. } => {
                        let scroll = match delta {
                            MouseScrollDelta::LineDelta(_, y) => y,
                            MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 20.0,
                        };
                        nav.scroll(scroll);
                    }

                    WindowEvent::DroppedFile(path) => {
                        ui.is_loading = true;
                        start_load_image(path, settings, tx.clone());
                    }

                    _ => {}
                }
            }

            Event::RedrawRequested(_) => {
                frame_count += 1;
                let now = Instant::now();
                let elapsed = now.duration_since(last_frame_time).as_secs_f32();
                if elapsed >= 1.0 {
                    ui.fps = frame_count as f32 / elapsed;
                    frame_count = 0;
                    last_frame_time = now;
                }

                nav.advance(now);
                renderer.update_camera(&nav, cfg.near_plane, cfg.far_plane);

                let has_scene = renderer.has_scene();
                let render_result = renderer.render_with_ui(&window, |ctx| {
                    draw_ui(ctx, &mut nav, &mut ui, &cfg, has_scene, &window);
                });

                if let Some(path) = ui.next_image.take() {
                    ui.is_loading = true;
                    start_load_image(path, settings, tx.clone());
                }

                match render_result {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost) => renderer.resize(renderer.size),
                    Err(wgpu::SurfaceError::OutOfMemory) => *control_flow = ControlFlow::Exit,
                    Err(e) => log::warn!("render error: {e:?}"),
                }
            }

            Event::MainEventsCleared => {
                window.request_redraw();
            }

            _ => {}
        }
    });
}

fn movement_for(key: VirtualKeyCode) -> Option<Movement> {
    match key {
        VirtualKeyCode::W => Some(Movement::Forward),
        VirtualKeyCode::S => Some(Movement::Backward),
        VirtualKeyCode::A => Some(Movement::Left),
        VirtualKeyCode::D => Some(Movement::Right),
        _ => None,
    }
}

// Presses stay with egui; releases always reach the navigation state.
fn apply_release(nav: &mut NavigationContext, event: &WindowEvent<'_>) {
    match event {
        WindowEvent::KeyboardInput { input, .. } if input.state == ElementState::Released => {
            if let Some(movement) = input.virtual_keycode.and_then(movement_for) {
                nav.set_held(movement, false);
            }
        }
        WindowEvent::MouseInput {
            state: ElementState::Released,
            button: MouseButton::Left,
            ..
        } => nav.set_dragging(false),
        _ => {}
    }
}

fn pick_image() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .add_filter("Stacked panorama", &IMAGE_EXTENSIONS)
        .pick_file()
}

fn toggle_fullscreen(window: &winit::window::Window, ui: &mut UiState) {
    ui.is_fullscreen = !ui.is_fullscreen;
    if ui.is_fullscreen {
        window.set_fullscreen(Some(Fullscreen::Borderless(None)));
    } else {
        window.set_fullscreen(None);
    }
}

fn start_load_image(path: PathBuf, settings: MeshSettings, tx: Sender<LoadResult>) {
    thread::spawn(move || {
        let result = load_panorama(&path, &settings);
        if tx.send(result).is_err() {
            log::warn!("viewer closed before {} finished loading", path.display());
        }
    });
}

fn draw_ui(
    ctx: &egui::Context,
    nav: &mut NavigationContext,
    ui_state: &mut UiState,
    cfg: &ViewerConfig,
    has_scene: bool,
    window: &winit::window::Window,
) {
    egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
        egui::menu::bar(ui, |ui| {
            ui.menu_button("File", |ui| {
                if ui.button("Open stacked image…").clicked() {
                    ui.close_menu();
                    ui_state.next_image = pick_image();
                }
                if ui.button("Exit").clicked() {
                    std::process::exit(0);
                }
            });

            ui.menu_button("View", |ui| {
                if ui.button("Reset camera").clicked() {
                    nav.reset();
                    ui.close_menu();
                }

                let fullscreen_label = if ui_state.is_fullscreen {
                    "Exit fullscreen"
                } else {
                    "Fullscreen"
                };
                if ui.button(fullscreen_label).clicked() {
                    toggle_fullscreen(window, ui_state);
                    ui.close_menu();
                }

                ui.separator();
                ui.label("Navigation");
                let before = nav.mode;
                ui.radio_value(&mut nav.mode, InteractMode::FreeView, "Free view");
                ui.radio_value(&mut nav.mode, InteractMode::GodView, "Orbit origin");
                if nav.mode != before && nav.mode == InteractMode::GodView {
                    nav.camera.observe_center();
                }

                ui.separator();
                ui.label("Display");
                ui.radio_value(&mut nav.display, DisplayMode::Color, "Colour");
                ui.radio_value(&mut nav.display, DisplayMode::Depth, "Depth");

                ui.separator();
                ui.checkbox(&mut ui_state.show_fps, "Show FPS");
            });
        });
    });

    egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            if ui_state.is_loading {
                ui.label(egui::RichText::new("Loading…").color(egui::Color32::YELLOW));
                ui.label("|");
            } else if let Some(err) = &ui_state.last_error {
                ui.label(egui::RichText::new(err).color(egui::Color32::RED));
                ui.label("|");
            } else if !has_scene {
                ui.label("Open or drop a stacked colour/disparity image (O)");
                ui.label("|");
            }

            ui.label(format!("Mode: {:?} / {:?}", nav.mode, nav.display));
            ui.label("|");
            let p = nav.camera.position;
            ui.label(format!("Pos: ({:.2}, {:.2}, {:.2})", p.x, p.y, p.z));
            ui.label("|");
            ui.label(format!("FOV: {:.1}°", nav.camera.zoom));
            ui.label("|");
            let grid = ui_state.mesh_grid.unwrap_or(cfg.grid);
            ui.label(format!("Grid: {}x{}", grid.cols, grid.rows));

            if let Some((vertices, triangles)) = ui_state.mesh_stats {
                ui.label("|");
                ui.label(format!("{vertices} vertices, {triangles} triangles"));
            }

            if ui_state.show_fps {
                ui.label("|");
                ui.label(
                    egui::RichText::new(format!("FPS: {:.1}", ui_state.fps))
                        .color(egui::Color32::GREEN),
                );
            }
        });
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use panorama_depth::camera::Camera;
    use std::time::Duration;
    use winit::event::DeviceId;

    #[allow(deprecated)]
    fn key(code: VirtualKeyCode, state: ElementState) -> WindowEvent<'static> {
        WindowEvent::KeyboardInput {
            device_id: unsafe { DeviceId::dummy() },
            input: KeyboardInput {
                scancode: 0,
                state,
                virtual_keycode: Some(code),
                modifiers: ModifiersState::empty(),
            },
            is_synthetic: false,
        }
    }

    #[allow(deprecated)]
    fn left_button(state: ElementState) -> WindowEvent<'static> {
        WindowEvent::MouseInput {
            device_id: unsafe { DeviceId::dummy() },
            state,
            button: MouseButton::Left,
            modifiers: ModifiersState::empty(),
        }
    }

    #[test]
    fn key_release_over_ui_stops_movement() {
        let mut nav = NavigationContext::new(Camera::default());
        let t0 = Instant::now();
        nav.advance(t0);
        nav.set_held(Movement::Forward, true);

        apply_release(&mut nav, &key(VirtualKeyCode::W, ElementState::Released));
        let start = nav.camera.position;
        nav.advance(t0 + Duration::from_millis(100));
        assert_eq!(nav.camera.position, start);
    }

    #[test]
    fn presses_and_other_keys_are_ignored() {
        let mut nav = NavigationContext::new(Camera::default());
        let t0 = Instant::now();
        nav.advance(t0);
        apply_release(&mut nav, &key(VirtualKeyCode::W, ElementState::Pressed));
        apply_release(&mut nav, &key(VirtualKeyCode::Tab, ElementState::Released));
        nav.advance(t0 + Duration::from_millis(100));
        assert_eq!(nav.camera.position, Camera::default().position);
        assert_eq!(nav.mode, InteractMode::FreeView);
    }

    #[test]
    fn button_release_over_ui_ends_drag() {
        let mut nav = NavigationContext::new(Camera::default());
        nav.set_dragging(true);
        nav.cursor_moved(0.0, 0.0);

        apply_release(&mut nav, &left_button(ElementState::Released));
        let yaw = nav.camera.yaw;
        nav.cursor_moved(100.0, 0.0);
        nav.cursor_moved(200.0, 0.0);
        assert_eq!(nav.camera.yaw, yaw);
    }

    #[test]
    fn wasd_maps_to_movement() {
        assert_eq!(movement_for(VirtualKeyCode::A), Some(Movement::Left));
        assert_eq!(movement_for(VirtualKeyCode::D), Some(Movement::Right));
        assert_eq!(movement_for(VirtualKeyCode::V), None);
    }
}
