//! `sluice symbols`: list what the binder built.

use sluice_engine::{Binder, SymbolId, SymbolKind};
use termcolor::ColorChoice;

use super::{binder_config, bind_sources};
use crate::output::StyledOutput;
use crate::BindArgs;

pub fn execute(args: &BindArgs, all: bool, color: ColorChoice) -> anyhow::Result<()> {
    let config = binder_config(args)?;
    let (mut binder, _) = bind_sources(args, config)?;
    let mut out = StyledOutput::new(color);

    if all {
        list_namespaces(&binder, &mut out);
    }
    let instances = binder.instances().to_vec();
    for instance in instances {
        list_instance(&mut binder, instance, &mut out);
    }
    out.flush();

    let errors = binder.diagnostics().error_count();
    if errors > 0 {
        anyhow::bail!("{} binding error(s); run `sluice check` for details", errors);
    }
    Ok(())
}

fn list_namespaces(binder: &Binder, out: &mut StyledOutput) {
    let table = binder.table();
    let root = table.scope(binder.root_scope());
    for (name, ns) in root.iter() {
        let Some(members) = table.symbol(ns).held else {
            continue;
        };
        let members = table.scope(members);
        if members.is_empty() {
            continue;
        }
        out.bold(&format!("namespace {}", if name.is_empty() { "<default>" } else { name }));
        out.newline();
        for (member, sym) in members.iter() {
            out.plain(&format!("  {:<24} ", member));
            out.info(table.symbol(sym).kind.kind_name());
            out.newline();
        }
    }
}

fn list_instance(binder: &mut Binder, instance: SymbolId, out: &mut StyledOutput) {
    let symbol = binder.table().symbol(instance);
    let SymbolKind::CompositeInstance(data) = &symbol.kind else {
        return;
    };
    let shown = if data.full_name.is_empty() {
        "<main>".to_string()
    } else {
        data.full_name.clone()
    };
    out.bold(&format!("instance {}", shown));
    out.plain(&format!(" of {}", symbol.name));
    out.newline();

    let invokes = data.invokes.clone();
    for invoke in invokes {
        let SymbolKind::OpInvoke(data) = &binder.table().symbol(invoke).kind else {
            continue;
        };
        let operator = data
            .target
            .map(|t| binder.table().symbol(t).name.clone())
            .unwrap_or_else(|| "?".to_string());
        let streams: Vec<SymbolId> = data.outputs.iter().map(|o| o.stream).collect();
        for stream in streams {
            let full_name = match &binder.table().symbol(stream).kind {
                SymbolKind::Stream(s) => s.full_name.clone(),
                _ => continue,
            };
            let ty = binder.type_of(stream);
            out.plain(&format!("  {:<24} ", full_name));
            out.info(&binder.display_type(ty));
            out.plain(&format!("  <- {}", operator));
            out.newline();
        }
    }
}
