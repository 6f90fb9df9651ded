//! Structural Verilog rendering of a [`Module`].
//!
//! Output layout follows the usual generated-top conventions: port list, net
//! declarations, continuous assignments, one `always` block per clock domain
//! and finally the black-box instances.

use std::collections::BTreeSet;
use std::fmt::Write;

use super::{Expr, Module, Param};

fn width_decl(width: u32) -> String {
    if width > 1 {
        format!("[{}:0] ", width - 1)
    } else {
        String::new()
    }
}

fn render_expr(expr: &Expr) -> String {
    match expr {
        Expr::Sig(name) => name.clone(),
        Expr::Bit(name, bit) => format!("{name}[{bit}]"),
        Expr::Const { value, width } => format!("{width}'d{value}"),
        Expr::Not(inner) => format!("(~{})", render_expr(inner)),
        Expr::Or(a, b) => format!("({} | {})", render_expr(a), render_expr(b)),
        Expr::Add(inner, k) => {
            let width = (64 - k.leading_zeros()).max(1);
            format!("({} + {width}'d{k})", render_expr(inner))
        }
    }
}

fn render_param(param: &Param) -> String {
    match param {
        Param::Int(v) => v.to_string(),
        Param::Str(s) => format!("\"{s}\""),
    }
}

/// Renders `module` as a Verilog source file.
pub fn emit(module: &Module) -> String {
    let mut out = String::new();
    let registers: BTreeSet<&str> = module
        .sync_statements()
        .iter()
        .map(|s| s.target.as_str())
        .collect();

    let _ = writeln!(out, "/* Machine-generated by colorlight-soc. Do not edit. */");
    let _ = writeln!(out);
    let _ = writeln!(out, "module {}(", module.name());
    let ports = module.ports();
    for (i, port) in ports.iter().enumerate() {
        let sep = if i + 1 == ports.len() { "" } else { "," };
        let _ = writeln!(
            out,
            "\t{} wire {}{}{sep}",
            port.dir,
            width_decl(port.width),
            port.name
        );
    }
    let _ = writeln!(out, ");");
    let _ = writeln!(out);

    for signal in module.signals() {
        if registers.contains(signal.name.as_str()) {
            let _ = writeln!(
                out,
                "reg  {}{} = {}'d{};",
                width_decl(signal.width),
                signal.name,
                signal.width,
                signal.reset
            );
        } else {
            let _ = writeln!(out, "wire {}{};", width_decl(signal.width), signal.name);
        }
    }
    let _ = writeln!(out);

    for assign in module.comb_statements() {
        let _ = writeln!(out, "assign {} = {};", assign.target, render_expr(&assign.value));
    }
    if !module.comb_statements().is_empty() {
        let _ = writeln!(out);
    }

    for domain in module.domains() {
        let stmts: Vec<_> = module
            .sync_statements()
            .iter()
            .filter(|s| s.domain == domain.name)
            .collect();
        if stmts.is_empty() {
            continue;
        }
        let _ = writeln!(out, "always @(posedge {}) begin", domain.clk());
        for stmt in &stmts {
            let _ = writeln!(out, "\t{} <= {};", stmt.target, render_expr(&stmt.value));
        }
        if let Some(rst) = domain.rst() {
            let _ = writeln!(out, "\tif ({rst}) begin");
            for stmt in &stmts {
                let width = module
                    .signals()
                    .iter()
                    .find(|s| s.name == stmt.target)
                    .map_or(1, |s| s.width);
                let _ = writeln!(out, "\t\t{} <= {width}'d0;", stmt.target);
            }
            let _ = writeln!(out, "\tend");
        }
        let _ = writeln!(out, "end");
        let _ = writeln!(out);
    }

    for inst in module.instances() {
        if inst.params.is_empty() {
            let _ = writeln!(out, "{} {}(", inst.kind, inst.name);
        } else {
            let _ = writeln!(out, "{} #(", inst.kind);
            for (i, (name, value)) in inst.params.iter().enumerate() {
                let sep = if i + 1 == inst.params.len() { "" } else { "," };
                let _ = writeln!(out, "\t.{name}({}){sep}", render_param(value));
            }
            let _ = writeln!(out, ") {} (", inst.name);
        }
        for (i, (name, expr)) in inst.ports.iter().enumerate() {
            let sep = if i + 1 == inst.ports.len() { "" } else { "," };
            let _ = writeln!(out, "\t.{name}({}){sep}", render_expr(expr));
        }
        let _ = writeln!(out, ");");
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "endmodule");
    out
}
