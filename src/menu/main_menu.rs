use crate::config::save::save_settings;
use crate::config::{BorderStyle, Config, Language};
use crate::menu::handlers::run_highlight_clipper;
use crate::tools::parse_hex_color;
use anyhow::Result;
use console::{Term, style};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Select};
use rust_i18n::t;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

pub fn show_main_menu(
    term: &Term,
    shutdown_signal: &Arc<AtomicBool>,
    config: &mut Config,
) -> Result<bool> {
    term.clear_screen()?;

    println!("{}", style(t!("main_menu.title")).cyan().bold());
    println!("{}", style(t!("common.esc_hint")).dim());

    let options = vec![
        t!("main_menu.opt_highlights"),
        t!("main_menu.opt_settings"),
        t!("main_menu.exit"),
    ];

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(t!("main_menu.prompt"))
        .items(&options)
        .default(0)
        .interact_on_opt(term)?;

    match selection {
        Some(0) => {
            run_highlight_clipper(term, shutdown_signal, config)?;
            Ok(true)
        }
        Some(1) => {
            show_settings_menu(term, config)?;
            Ok(true)
        }
        Some(2) => Ok(false),
        None => Ok(false), // ESC pressed - exit
        _ => unreachable!(),
    }
}

/// 設定選單
fn show_settings_menu(term: &Term, config: &mut Config) -> Result<()> {
    loop {
        term.clear_screen()?;

        println!("{}", style(t!("settings.title")).cyan().bold());
        println!("{}", style(t!("common.esc_hint")).dim());

        let options = vec![
            t!("settings.opt_clip"),
            t!("settings.opt_frame"),
            t!("settings.opt_caption"),
            t!("settings.opt_language"),
            t!("settings.back"),
        ];

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt(t!("settings.prompt"))
            .items(&options)
            .default(0)
            .interact_on_opt(term)?;

        match selection {
            Some(0) => show_clip_settings_menu(term, config)?,
            Some(1) => show_frame_settings_menu(term, config)?,
            Some(2) => show_caption_settings_menu(term, config)?,
            Some(3) => show_language_menu(term, config)?,
            Some(4) | None => break, // ESC or back
            _ => unreachable!(),
        }
    }

    Ok(())
}

fn confirm_saved(config: &Config) -> Result<()> {
    save_settings(&config.settings)?;
    println!("\n{}", style(t!("settings.saved")).green());
    std::thread::sleep(std::time::Duration::from_secs(1));
    Ok(())
}

fn on_off(value: bool) -> String {
    if value {
        t!("common.on").to_string()
    } else {
        t!("common.off").to_string()
    }
}

/// 片段設定選單
fn show_clip_settings_menu(term: &Term, config: &mut Config) -> Result<()> {
    loop {
        term.clear_screen()?;

        println!("{}", style(t!("settings.clip.title")).cyan().bold());
        println!("{}", style(t!("common.esc_hint")).dim());

        let clip = &config.settings.clip;
        let items = vec![
            format!("{}: {}", t!("settings.clip.count"), clip.clip_count),
            format!("{}: {}", t!("settings.clip.create_all"), on_off(clip.create_all_clips)),
            format!("{}: {:.1}s", t!("settings.clip.duration"), clip.clip_duration),
            format!("{}: {:.1}s", t!("settings.clip.min_duration"), clip.min_clip_duration),
            format!("{}: {:.1}s", t!("settings.clip.max_duration"), clip.max_clip_duration),
            format!("{}: {:.0}s", t!("settings.clip.analysis_duration"), clip.analysis_duration),
            format!("{}: {}", t!("settings.clip.vertical"), on_off(clip.vertical)),
            format!("{}: {}", t!("settings.encoder.crf"), config.settings.encoder.crf),
            format!("{}: {}", t!("settings.encoder.threads"), config.settings.encoder.threads),
            t!("settings.back").to_string(),
        ];

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt(t!("settings.clip.prompt"))
            .items(&items)
            .default(0)
            .interact_on_opt(term)?;

        let clip = &mut config.settings.clip;
        match selection {
            Some(0) => {
                clip.clip_count = Input::new()
                    .with_prompt(t!("settings.clip.count"))
                    .default(clip.clip_count)
                    .validate_with(|v: &usize| {
                        if *v > 0 { Ok(()) } else { Err(t!("settings.invalid_value")) }
                    })
                    .interact_text()?;
            }
            Some(1) => clip.create_all_clips = !clip.create_all_clips,
            Some(2) => {
                clip.clip_duration = prompt_seconds(&t!("settings.clip.duration"), clip.clip_duration)?;
            }
            Some(3) => {
                clip.min_clip_duration =
                    prompt_seconds(&t!("settings.clip.min_duration"), clip.min_clip_duration)?;
            }
            Some(4) => {
                clip.max_clip_duration =
                    prompt_seconds(&t!("settings.clip.max_duration"), clip.max_clip_duration)?;
            }
            Some(5) => {
                clip.analysis_duration =
                    prompt_seconds(&t!("settings.clip.analysis_duration"), clip.analysis_duration)?;
            }
            Some(6) => clip.vertical = !clip.vertical,
            Some(7) => {
                config.settings.encoder.crf = Input::new()
                    .with_prompt(t!("settings.encoder.crf"))
                    .default(config.settings.encoder.crf)
                    .validate_with(|v: &u8| {
                        if *v <= 51 { Ok(()) } else { Err(t!("settings.invalid_value")) }
                    })
                    .interact_text()?;
            }
            Some(8) => {
                config.settings.encoder.threads = Input::new()
                    .with_prompt(t!("settings.encoder.threads"))
                    .default(config.settings.encoder.threads)
                    .interact_text()?;
            }
            Some(9) | None => return Ok(()),
            _ => unreachable!(),
        }

        confirm_saved(config)?;
    }
}

/// 直式邊框設定選單
fn show_frame_settings_menu(term: &Term, config: &mut Config) -> Result<()> {
    loop {
        term.clear_screen()?;

        println!("{}", style(t!("settings.frame.title")).cyan().bold());
        println!("{}", style(t!("common.esc_hint")).dim());

        let frame = &config.settings.frame;
        let items = vec![
            format!("{}: {}", t!("settings.frame.style"), frame.border_style),
            format!("{}: {}", t!("settings.frame.color"), frame.border_color),
            format!("{}: {}", t!("settings.frame.width"), frame.border_width),
            format!("{}: {}", t!("settings.frame.blur"), frame.blur_strength),
            t!("settings.back").to_string(),
        ];

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt(t!("settings.frame.prompt"))
            .items(&items)
            .default(0)
            .interact_on_opt(term)?;

        let frame = &mut config.settings.frame;
        match selection {
            Some(0) => {
                let styles = [BorderStyle::None, BorderStyle::Solid, BorderStyle::Blur];
                let labels: Vec<String> = styles.iter().map(ToString::to_string).collect();
                let default_index = styles
                    .iter()
                    .position(|&s| s == frame.border_style)
                    .unwrap_or(0);

                let Some(index) = Select::with_theme(&ColorfulTheme::default())
                    .with_prompt(t!("settings.frame.style"))
                    .items(&labels)
                    .default(default_index)
                    .interact_on_opt(term)?
                else {
                    continue;
                };
                frame.border_style = styles[index];
            }
            Some(1) => {
                frame.border_color = Input::new()
                    .with_prompt(t!("settings.frame.color"))
                    .default(frame.border_color.clone())
                    .validate_with(|v: &String| {
                        parse_hex_color(v)
                            .map(|_| ())
                            .map_err(|_| t!("settings.invalid_color"))
                    })
                    .interact_text()?;
            }
            Some(2) => {
                frame.border_width = Input::new()
                    .with_prompt(t!("settings.frame.width"))
                    .default(frame.border_width)
                    .interact_text()?;
            }
            Some(3) => {
                frame.blur_strength = Input::new()
                    .with_prompt(t!("settings.frame.blur"))
                    .default(frame.blur_strength)
                    .interact_text()?;
            }
            Some(4) | None => return Ok(()),
            _ => unreachable!(),
        }

        confirm_saved(config)?;
    }
}

/// 字幕設定選單
fn show_caption_settings_menu(term: &Term, config: &mut Config) -> Result<()> {
    loop {
        term.clear_screen()?;

        println!("{}", style(t!("settings.caption.title")).cyan().bold());
        println!("{}", style(t!("common.esc_hint")).dim());

        let caption = &config.settings.caption;
        let items = vec![
            format!("{}: {}", t!("settings.caption.enabled"), on_off(caption.enabled)),
            format!("{}: {}", t!("settings.caption.model"), caption.model),
            format!("{}: {}", t!("settings.caption.language"), caption.language),
            format!("{}: {}", t!("settings.caption.model_dir"), caption.model_dir.display()),
            format!("{}: {}", t!("settings.caption.font_size"), caption.font_size),
            format!("{}: {}", t!("settings.caption.font_color"), caption.font_color),
            t!("settings.back").to_string(),
        ];

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt(t!("settings.caption.prompt"))
            .items(&items)
            .default(0)
            .interact_on_opt(term)?;

        let caption = &mut config.settings.caption;
        match selection {
            Some(0) => caption.enabled = !caption.enabled,
            Some(1) => {
                caption.model = Input::new()
                    .with_prompt(t!("settings.caption.model"))
                    .default(caption.model.clone())
                    .interact_text()?;
            }
            Some(2) => {
                caption.language = Input::new()
                    .with_prompt(t!("settings.caption.language"))
                    .default(caption.language.clone())
                    .interact_text()?;
            }
            Some(3) => {
                let dir: String = Input::new()
                    .with_prompt(t!("settings.caption.model_dir"))
                    .default(caption.model_dir.to_string_lossy().to_string())
                    .interact_text()?;
                caption.model_dir = PathBuf::from(dir.trim());
            }
            Some(4) => {
                caption.font_size = Input::new()
                    .with_prompt(t!("settings.caption.font_size"))
                    .default(caption.font_size)
                    .interact_text()?;
            }
            Some(5) => {
                caption.font_color = Input::new()
                    .with_prompt(t!("settings.caption.font_color"))
                    .default(caption.font_color.clone())
                    .validate_with(|v: &String| {
                        parse_hex_color(v)
                            .map(|_| ())
                            .map_err(|_| t!("settings.invalid_color"))
                    })
                    .interact_text()?;
            }
            Some(6) | None => return Ok(()),
            _ => unreachable!(),
        }

        confirm_saved(config)?;
    }
}

fn prompt_seconds(prompt: &str, current: f64) -> Result<f64> {
    let value = Input::new()
        .with_prompt(prompt)
        .default(current)
        .validate_with(|v: &f64| {
            if v.is_finite() && *v > 0.0 {
                Ok(())
            } else {
                Err(t!("settings.invalid_value"))
            }
        })
        .interact_text()?;
    Ok(value)
}

/// 語言設定選單
fn show_language_menu(term: &Term, config: &mut Config) -> Result<()> {
    term.clear_screen()?;

    println!("{}", style(t!("settings.language.title")).cyan().bold());
    println!("{}", style(t!("common.esc_hint")).dim());

    let languages = [Language::EnUs, Language::ZhTw];

    let items: Vec<String> = languages.iter().map(|l: &Language| l.to_string()).collect();

    let default_index = languages
        .iter()
        .position(|&l| l == config.settings.language)
        .unwrap_or(0);

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(t!("settings.language.prompt"))
        .items(&items)
        .default(default_index)
        .interact_on_opt(term)?;

    // ESC pressed - return without saving
    let Some(selection) = selection else {
        return Ok(());
    };

    let selected_lang = languages[selection];

    if selected_lang != config.settings.language {
        config.settings.language = selected_lang;
        rust_i18n::set_locale(selected_lang.as_str());
        save_settings(&config.settings)?;
        println!(
            "\n{} {}",
            style(t!("settings.saved")).green(),
            selected_lang
        );
        std::thread::sleep(std::time::Duration::from_secs(1));
    }

    Ok(())
}
