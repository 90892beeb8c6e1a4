use std::path::Path;

use r2g_core::config::MigratorConfig;

use super::load_config;

pub fn run(path: &Path) -> anyhow::Result<()> {
    let config = load_config(Some(path))?;
    print!("{}", render(&config));
    Ok(())
}

fn render(config: &MigratorConfig) -> String {
    let cache = &config.cache;
    let mut out = String::new();
    let mut line = |key: &str, value: String| {
        out.push_str(&format!("{key:<32} {value}\n"));
    };

    line("user.name", config.user_name.clone());
    line("user.email", config.user_email.clone());
    line("commit.message.format", format!("{:?}", config.commit_message_format.as_str()));
    line("rtc.workitem.number.format", format!("{:?}", config.workitem_number_format.as_str()));
    line("rtc.workitem.number.delimiter", format!("{:?}", config.workitem_number_delimiter));
    line("ignore.file.extensions", config.ignored_file_extensions.join(";"));
    line("global.gitignore.entries", config.global_gitignore_entries.join(";"));
    line("gitattributes", config.gitattributes.join(";"));
    line("packedgitopenfiles", cache.packed_git_open_files.to_string());
    line("packedgitlimit", cache.packed_git_limit.to_string());
    line("packedgitwindowsize", cache.packed_git_window_size.to_string());
    line("packedgitmmap", cache.packed_git_mmap.to_string());
    line("deltabasecachelimit", cache.delta_base_cache_limit.to_string());
    line("streamfilethreshold", cache.stream_file_threshold.to_string());
    out
}
