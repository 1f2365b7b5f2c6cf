//! # clockwork-orange CLI
//!
//! Command-line interface for the wallpaper rotator.
//!
//! ## Usage
//! ```bash
//! clockwork-orange pick --dual
//! clockwork-orange cycle --wait 600
//! clockwork-orange review local
//! clockwork-orange blacklist list --filter wallhaven
//! ```

mod cli;

use clockwork_orange::Result;

fn main() -> Result<()> {
    cli::run()
}
