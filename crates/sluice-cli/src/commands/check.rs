//! `sluice check`: bind sources and report diagnostics.

use termcolor::{ColorChoice, StandardStream};

use super::{binder_config, bind_sources};
use crate::output::StyledOutput;
use crate::BindArgs;

pub fn execute(
    args: &BindArgs,
    json: bool,
    deny_warnings: bool,
    color: ColorChoice,
) -> anyhow::Result<()> {
    let mut config = binder_config(args)?;
    if deny_warnings {
        config.warnings.deny_all = true;
    }
    let (binder, files) = bind_sources(args, config)?;
    let diagnostics = binder.diagnostics();

    if json {
        println!("{}", diagnostics.to_json(binder.files())?);
    } else {
        let mut stderr = StandardStream::stderr(color);
        diagnostics.emit_all(&mut stderr, binder.files())?;
        let mut out = StyledOutput::new(color);
        out.summary(files, diagnostics.error_count(), diagnostics.warning_count());
    }

    if diagnostics.has_errors() {
        anyhow::bail!(
            "binding failed with {} error{}",
            diagnostics.error_count(),
            if diagnostics.error_count() == 1 { "" } else { "s" }
        );
    }
    Ok(())
}
