use std::fmt;

use crate::config::types::{RouteConfig, ServerConfig};

impl fmt::Display for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "  \x1b[38;5;244m───────────────────────────────────────────────\x1b[0m"
        )?;
        writeln!(
            f,
            "  \x1b[1;34m⦿\x1b[0m \x1b[1;37mListen:\x1b[0m      \x1b[1;32m{}\x1b[0m",
            self.listen
        )?;
        writeln!(
            f,
            "  \x1b[1;34m⦿\x1b[0m \x1b[1;37mIdentity:\x1b[0m    \x1b[36m{}\x1b[0m",
            if self.server_name.is_empty() {
                "_"
            } else {
                &self.server_name
            }
        )?;
        writeln!(
            f,
            "  \x1b[1;34m⦿\x1b[0m \x1b[1;37mBody Limit:\x1b[0m  \x1b[33m{} KB\x1b[0m",
            self.max_body_size / 1024
        )?;

        if !self.error_pages.is_empty() {
            writeln!(f, "  \x1b[1;34m⦿\x1b[0m \x1b[1;37mError Pages:\x1b[0m")?;
            for (code, path) in &self.error_pages {
                writeln!(f, "    \x1b[38;5;244m{:4}\x1b[0m → \x1b[31m{}\x1b[0m", code, path)?;
            }
        }

        writeln!(f, "\n  \x1b[1;37m📋 ROUTING TABLE ({}) \x1b[0m", self.routes.len())?;
        writeln!(
            f,
            "  \x1b[38;5;244m───────────────────────────────────────────────\x1b[0m"
        )?;

        for (idx, route) in self.routes.iter().enumerate() {
            let is_last = idx == self.routes.len() - 1;
            let branch = if is_last { "  └──" } else { "  ├──" };
            writeln!(f, "  \x1b[38;5;244m{}\x1b[0m \x1b[1;37m{}\x1b[0m", branch, route.path)?;
            route.fmt_details(f, self, is_last)?;
        }
        Ok(())
    }
}

impl RouteConfig {
    pub(crate) fn fmt_details(
        &self,
        f: &mut fmt::Formatter<'_>,
        parent: &ServerConfig,
        is_last_route: bool,
    ) -> fmt::Result {
        let indent = if is_last_route { "     " } else { "  │  " };
        let methods = self.methods.as_ref().unwrap_or(&parent.methods).join(" | ");
        let root = self.root.as_deref().unwrap_or(&parent.root);
        let autoindex = self.autoindex.unwrap_or(parent.autoindex);

        writeln!(f, "  \x1b[38;5;250m{}├─ Methods:\x1b[0m {}", indent, methods)?;
        writeln!(f, "  \x1b[38;5;250m{}├─ Root:\x1b[0m    \x1b[32m{}\x1b[0m", indent, root)?;
        writeln!(
            f,
            "  \x1b[38;5;250m{}├─ Autoindex:\x1b[0m \x1b[{}m{}\x1b[0m",
            indent,
            if autoindex { "32" } else { "31" },
            if autoindex { "ON" } else { "OFF" }
        )?;

        if let Some((code, target)) = &self.redirect {
            writeln!(f, "  \x1b[38;5;250m{}├─ Redirect:\x1b[0m \x1b[35m{} -> {}\x1b[0m", indent, code, target)?;
        }
        match self.cgi_ext.as_ref().or(Some(&parent.cgi_ext)).filter(|v| !v.is_empty()) {
            Some(exts) => writeln!(
                f,
                "  \x1b[38;5;250m{}└─ CGI:\x1b[0m     \x1b[38;5;208m{}\x1b[0m",
                indent,
                exts.join(", ")
            )?,
            None => writeln!(f, "  \x1b[38;5;250m{}└─ CGI:\x1b[0m      \x1b[31mDISABLED\x1b[0m", indent)?,
        }
        Ok(())
    }
}

pub fn display_config(configs: &[ServerConfig]) {
    println!("\n\x1b[1;35m 🌐 SERVER CONFIGURATION DASHBOARD\x1b[0m");
    println!("\x1b[38;5;240m ════════════════════════════════════════════════════════════════\x1b[0m");
    for (i, server) in configs.iter().enumerate() {
        println!("\n  \x1b[1;37mSERVER BLOCK {:02}\x1b[0m", i + 1);
        print!("{}", server);
    }
    println!("\n\x1b[38;5;240m ════════════════════════════════════════════════════════════════\x1b[0m");
    println!(" \x1b[1;32m✔\x1b[0m Configuration loaded successfully - Ready for requests!\n");
}
