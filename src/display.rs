use crate::config::Config;
use crate::propagation::Propagator;
use crate::tracking::TrackedSatellites;
use crate::tui;
use anyhow::Result;
use std::io::{self, Write};

/// Ways of showing the ranked list, chosen once at startup.
pub enum Presenter {
    Console(ConsolePresenter),
    Interactive(tui::InteractivePresenter),
}

impl Presenter {
    pub fn from_config(config: &Config) -> Self {
        if config.interactive {
            Presenter::Interactive(tui::InteractivePresenter::new(config.refresh))
        } else {
            Presenter::Console(ConsolePresenter)
        }
    }

    pub fn render<P: Propagator>(&mut self, sats: &mut TrackedSatellites<P>) -> Result<()> {
        match self {
            Presenter::Console(p) => p.render(sats),
            Presenter::Interactive(p) => p.render(sats),
        }
    }
}

/// Prints the list once, in its current order.
pub struct ConsolePresenter;

impl ConsolePresenter {
    pub fn render<P>(&self, sats: &TrackedSatellites<P>) -> Result<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.render_to(&mut out, sats)?;
        out.flush()?;
        Ok(())
    }

    pub fn render_to<W: Write, P>(&self, out: &mut W, sats: &TrackedSatellites<P>) -> Result<()> {
        let total = sats.len();
        for (i, tracked) in sats.iter().enumerate() {
            writeln!(
                out,
                "[{}/{}] ({}): LookAngle: {}",
                i + 1,
                total,
                tracked.record.display_name(),
                tracked.look
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::tests::{FakePropagator, observer, records};

    #[test]
    fn test_console_lists_in_order() {
        let fake = FakePropagator::with(&[(25544, 420.5), (20580, 1500.0)]);
        let (sats, _) = TrackedSatellites::from_records(observer(), &fake, records());

        let mut out = Vec::new();
        ConsolePresenter.render_to(&mut out, &sats).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "[1/3] (ISS (ZARYA)): LookAngle: Az: 180.000, El: 10.000, Rng: 420.500",
                "[2/3] (HST): LookAngle: Az: 180.000, El: 10.000, Rng: 1500.000",
                "[3/3] (NOAA 20): LookAngle: unavailable",
            ]
        );
    }

    #[test]
    fn test_console_uses_catalog_id_for_unnamed() {
        let fake = FakePropagator::with(&[(20580, 1.0)]);
        let mut sats = TrackedSatellites::new(observer(), &fake);
        let unnamed = crate::parser::OrbitalRecord::new(
            "",
            crate::parser::tests::HST_L1,
            crate::parser::tests::HST_L2,
        )
        .unwrap();
        sats.add(unnamed).unwrap();

        let mut out = Vec::new();
        ConsolePresenter.render_to(&mut out, &sats).unwrap();
        assert!(String::from_utf8(out).unwrap().starts_with("[1/1] (20580):"));
    }

    #[test]
    fn test_console_empty_set_prints_nothing() {
        let fake = FakePropagator::default();
        let sats = TrackedSatellites::new(observer(), &fake);
        let mut out = Vec::new();
        ConsolePresenter.render_to(&mut out, &sats).unwrap();
        assert!(out.is_empty());
    }
}
