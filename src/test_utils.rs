/// Install a compact logger for tests. Safe to call from every test.
pub fn init_test_logger() {
    use std::io::Write as _;
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .format(|buf, record| {
            // Ansi256 ref: https://hexdocs.pm/color_palette/ansi_color_codes.html
            let bg = anstyle::Ansi256Color(236);
            let level_style = buf
                .default_level_style(record.level())
                .bg_color(Some(bg.into()));
            let grey = anstyle::Ansi256Color(250).on(bg);

            let file = record
                .file()
                .and_then(|f| std::path::Path::new(f).file_name())
                .map_or("unknown".into(), |name| name.to_string_lossy());
            writeln!(
                buf,
                "{grey}[{grey:#}{level_style}{}{level_style:#}{grey} {}:{}]{grey:#}   {}",
                record.level(),
                file,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .try_init();
}
