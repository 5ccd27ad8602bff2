use std::io;
use std::sync::mpsc::{self, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crossterm::ExecutableCommand;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use miette::IntoDiagnostic;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Gauge, Paragraph};

use crate::pipeline::RunPlan;
use crate::progress::ProgressSink;

const SPINNER: &[&str] = &["|", "/", "-", "\\"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lane {
    XenoCanto,
    Macaulay,
}

impl Lane {
    fn title(self) -> &'static str {
        match self {
            Lane::XenoCanto => "XC download",
            Lane::Macaulay => "eBird download",
        }
    }
}

#[derive(Debug)]
struct GaugeState {
    xeno_canto: f64,
    macaulay: f64,
    plan: RunPlan,
    started: Instant,
}

impl GaugeState {
    fn lane_mut(&mut self, lane: Lane) -> &mut f64 {
        match lane {
            Lane::XenoCanto => &mut self.xeno_canto,
            Lane::Macaulay => &mut self.macaulay,
        }
    }

    fn lane(&self, lane: Lane) -> f64 {
        match lane {
            Lane::XenoCanto => self.xeno_canto,
            Lane::Macaulay => self.macaulay,
        }
    }

    fn enabled(&self, lane: Lane) -> bool {
        match lane {
            Lane::XenoCanto => self.plan.xeno_canto,
            Lane::Macaulay => self.plan.macaulay,
        }
    }
}

struct GaugeSink {
    state: Arc<Mutex<GaugeState>>,
    lane: Lane,
}

impl ProgressSink for GaugeSink {
    fn notify(&self, fraction: f64) {
        if let Ok(mut state) = self.state.lock() {
            let slot = state.lane_mut(self.lane);
            *slot = slot.max(fraction.clamp(0.0, 1.0));
        }
    }
}

/// Full-screen view with one progress gauge per pipeline.
pub struct Tui {
    state: Arc<Mutex<GaugeState>>,
}

impl Tui {
    pub fn new(plan: RunPlan) -> Self {
        Self {
            state: Arc::new(Mutex::new(GaugeState {
                xeno_canto: 0.0,
                macaulay: 0.0,
                plan,
                started: Instant::now(),
            })),
        }
    }

    /// Runs `f` on a worker thread while drawing both gauges. `q` or Ctrl-C
    /// leaves the view early with an error.
    pub fn run<F, R>(&mut self, f: F) -> miette::Result<R>
    where
        F: FnOnce(&dyn ProgressSink, &dyn ProgressSink) -> R + Send + 'static,
        R: Send + 'static,
    {
        let mut stdout = io::stdout();
        enable_raw_mode().into_diagnostic()?;
        stdout.execute(EnterAlternateScreen).into_diagnostic()?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).into_diagnostic()?;
        terminal.clear().into_diagnostic()?;

        let (tx, rx) = mpsc::channel();
        let xeno_sink = GaugeSink {
            state: self.state.clone(),
            lane: Lane::XenoCanto,
        };
        let macaulay_sink = GaugeSink {
            state: self.state.clone(),
            lane: Lane::Macaulay,
        };
        let handle = thread::spawn(move || tx.send(f(&xeno_sink, &macaulay_sink)));

        let mut tick = 0usize;
        let outcome = loop {
            if let Ok(state) = self.state.lock() {
                terminal
                    .draw(|frame| {
                        let rows = Layout::default()
                            .direction(Direction::Vertical)
                            .margin(1)
                            .constraints([
                                Constraint::Length(3),
                                Constraint::Length(3),
                                Constraint::Length(3),
                                Constraint::Min(1),
                            ])
                            .split(frame.area());
                        frame.render_widget(draw_header(&state, tick), rows[0]);
                        frame.render_widget(draw_gauge(&state, Lane::XenoCanto), rows[1]);
                        frame.render_widget(draw_gauge(&state, Lane::Macaulay), rows[2]);
                        frame.render_widget(
                            Paragraph::new(Line::from("q / Ctrl-C: leave"))
                                .style(Style::default().fg(Color::DarkGray)),
                            rows[3],
                        );
                    })
                    .into_diagnostic()?;
            }

            match rx.try_recv() {
                Ok(result) => {
                    handle.join().ok();
                    break Ok(result);
                }
                Err(TryRecvError::Disconnected) => {
                    break Err(miette::Report::msg("download worker stopped unexpectedly"));
                }
                Err(TryRecvError::Empty) => {}
            }

            if event::poll(Duration::from_millis(120)).into_diagnostic()?
                && let Event::Key(key) = event::read().into_diagnostic()?
                && key.kind == KeyEventKind::Press
            {
                let ctrl_c = key.code == KeyCode::Char('c')
                    && key.modifiers.contains(KeyModifiers::CONTROL);
                if key.code == KeyCode::Char('q') || ctrl_c {
                    break Err(miette::Report::msg("aborted"));
                }
            }

            tick = tick.wrapping_add(1);
        };

        disable_raw_mode().into_diagnostic()?;
        let mut stdout = io::stdout();
        stdout.execute(LeaveAlternateScreen).into_diagnostic()?;
        outcome
    }
}

fn draw_header(state: &GaugeState, tick: usize) -> Paragraph<'static> {
    let elapsed = state.started.elapsed().as_secs();
    let spinner = SPINNER[tick % SPINNER.len()];
    Paragraph::new(Line::from(format!(
        "{spinner} birdcall  elapsed {:02}:{:02}",
        elapsed / 60,
        elapsed % 60
    )))
    .alignment(Alignment::Left)
    .style(Style::default().add_modifier(Modifier::BOLD))
    .block(Block::default().borders(Borders::ALL))
}

fn draw_gauge(state: &GaugeState, lane: Lane) -> Gauge<'static> {
    let ratio = state.lane(lane);
    let (label, color) = if !state.enabled(lane) {
        ("skipped".to_string(), Color::DarkGray)
    } else if ratio >= 1.0 {
        ("done".to_string(), Color::Green)
    } else {
        (format!("{:>3}%", (ratio * 100.0) as u8), Color::Cyan)
    };
    Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(lane.title()))
        .gauge_style(Style::default().fg(color))
        .ratio(ratio)
        .label(label)
}
