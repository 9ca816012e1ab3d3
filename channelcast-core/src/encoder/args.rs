//! Builds the `ffmpeg` argument vector and filter graph for one play of one
//! playlist item.

use std::path::PathBuf;

use crate::models::{EncoderParams, Overlay, OverlayType};

/// The primary input the encoder reads from.
#[derive(Debug, Clone)]
pub enum InputSpec {
    /// An on-disk media file, played with wall-clock (`-re`) pacing.
    Media { path: PathBuf },
    /// A pass-through UDP/MPEG-TS stream.
    Udp { url: String },
}

/// Everything the Encoder Driver needs to play one item.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub input: InputSpec,
    /// Seek offset applied at the input side, in seconds.
    pub start_offset_seconds: f64,
    /// Duration cap, in seconds. `0.0` means "no cap" and is only valid
    /// when the caller has already resolved a finite playback window.
    pub duration_cap_seconds: f64,
    pub encoder: EncoderParams,
    /// Enabled overlays in declaration order, including any item-specific
    /// program-name text overlay the Playback Engine has synthesized.
    pub overlays: Vec<Overlay>,
    pub font_dir: PathBuf,
    pub output_url: String,
}

impl StreamConfig {
    fn primary_input(&self) -> String {
        match &self.input {
            InputSpec::Media { path } => path.to_string_lossy().into_owned(),
            InputSpec::Udp { url } => url.clone(),
        }
    }

    fn image_overlays(&self) -> impl Iterator<Item = &Overlay> {
        self.overlays.iter().filter(|o| o.overlay_type == OverlayType::Image)
    }
}

fn format_seconds(seconds: f64) -> String {
    format!("{seconds:.3}")
}

/// Assembles the full `ffmpeg` argument vector, in the fixed order the
/// encoder's command-line contract requires: hwaccel init, input pacing,
/// seek/duration, inputs, codec blocks, filter graph, MPEG-TS output,
/// progress pipe.
#[must_use]
pub fn build_args(config: &StreamConfig) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();

    args.extend(["-hwaccel".into(), "cuda".into(), "-hwaccel_output_format".into(), "cuda".into()]);

    match &config.input {
        InputSpec::Media { .. } => args.push("-re".into()),
        InputSpec::Udp { .. } => {
            args.extend(["-f".into(), "mpegts".into(), "-async".into(), "30".into()]);
        }
    }

    if config.start_offset_seconds > 0.0 {
        args.push("-ss".into());
        args.push(format_seconds(config.start_offset_seconds));
    }
    if config.duration_cap_seconds > 0.0 {
        args.push("-t".into());
        args.push(format_seconds(config.duration_cap_seconds));
    }

    args.push("-i".into());
    args.push(config.primary_input());

    for overlay in config.image_overlays() {
        let Some(image_path) = &overlay.image_path else { continue };
        args.push("-i".into());
        args.push(config.font_dir.join(image_path).to_string_lossy().into_owned());
    }

    args.extend(video_codec_block(&config.encoder));
    args.extend(audio_codec_block(&config.encoder));

    let enabled_overlays: Vec<&Overlay> = config.overlays.iter().filter(|o| o.enabled).collect();
    if !enabled_overlays.is_empty() {
        let graph = build_filter_graph(&config.encoder, &enabled_overlays, &config.font_dir);
        args.push("-filter_complex".into());
        args.push(graph);
        args.push("-map".into());
        args.push("[outv]".into());
        args.push("-map".into());
        args.push("0:a".into());
    }

    args.extend(mpegts_block(&config.encoder));

    args.push("-f".into());
    args.push("mpegts".into());
    args.push(config.output_url.clone());

    args.push("-progress".into());
    args.push("pipe:2".into());

    args
}

fn video_codec_block(encoder: &EncoderParams) -> Vec<String> {
    vec![
        "-c:v".into(),
        encoder.video_codec.clone(),
        "-b:v".into(),
        format!("{}k", encoder.video_bitrate_kbps),
        "-minrate".into(),
        format!("{}k", encoder.video_min_bitrate_kbps),
        "-maxrate".into(),
        format!("{}k", encoder.video_max_bitrate_kbps),
        "-bufsize".into(),
        format!("{}k", encoder.buffer_size_kbps),
        "-preset".into(),
        "p1".into(),
        "-tune".into(),
        "ull".into(),
        "-rc".into(),
        "cbr".into(),
        "-g".into(),
        "60".into(),
        "-keyint_min".into(),
        "60".into(),
        "-sc_threshold".into(),
        "0".into(),
        "-r".into(),
        "30".into(),
    ]
}

fn audio_codec_block(encoder: &EncoderParams) -> Vec<String> {
    vec![
        "-c:a".into(),
        encoder.audio_codec.clone(),
        "-b:a".into(),
        format!("{}k", encoder.audio_bitrate_kbps),
    ]
}

fn mpegts_block(encoder: &EncoderParams) -> Vec<String> {
    vec![
        "-pkt_size".into(),
        encoder.packet_size.to_string(),
        "-mpegts_transport_stream_id".into(),
        encoder.transport_stream_id.to_string(),
        "-mpegts_original_network_id".into(),
        encoder.network_id.to_string(),
        "-mpegts_service_id".into(),
        encoder.service_id.to_string(),
        "-mpegts_service_type".into(),
        "digital_tv".into(),
        "-metadata".into(),
        format!("service_provider={}", encoder.service_provider),
        "-metadata".into(),
        format!("service_name={}", encoder.service_name),
    ]
}

/// `[0:v]scale_cuda=WxH[v0]; [v0]hwdownload,format=nv12[v1]; <drawtext/overlay
/// chain>; [vN]format=nv12,hwupload_cuda,format=cuda[outv]`
fn build_filter_graph(encoder: &EncoderParams, overlays: &[&Overlay], font_dir: &std::path::Path) -> String {
    let mut stages = Vec::new();
    stages.push(format!("[0:v]scale_cuda={}x{}[v0]", encoder.width, encoder.height));
    stages.push("[v0]hwdownload,format=nv12[v1]".to_string());

    let mut label_index = 1usize;
    let mut image_input_index = 1usize;

    for overlay in overlays {
        let in_label = format!("v{label_index}");
        label_index += 1;
        let out_label = format!("v{label_index}");

        match overlay.overlay_type {
            OverlayType::Text => {
                let text = overlay.text.as_deref().unwrap_or_default().replace('\'', "\\'");
                let font_size = overlay.font_size.unwrap_or(24);
                let font_color = overlay.font_color.as_deref().unwrap_or("white");
                stages.push(format!(
                    "[{in_label}]drawtext=fontfile={font}:text='{text}':x={x}:y={y}:fontsize={font_size}:fontcolor={font_color}[{out_label}]",
                    font = font_dir.join("font.ttf").to_string_lossy(),
                    x = overlay.x_expr,
                    y = overlay.y_expr,
                ));
            }
            OverlayType::Image => {
                stages.push(format!(
                    "[{in_label}][{image_input_index}:v]overlay=x={x}:y={y}[{out_label}]",
                    x = overlay.x_expr,
                    y = overlay.y_expr,
                ));
                image_input_index += 1;
            }
        }
    }

    stages.push(format!("[v{label_index}]format=nv12,hwupload_cuda,format=cuda[outv]"));
    stages.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChannelId, OverlayId};

    fn config(overlays: Vec<Overlay>) -> StreamConfig {
        StreamConfig {
            input: InputSpec::Media { path: PathBuf::from("/srv/media/show/ep1.mp4") },
            start_offset_seconds: 100.0,
            duration_cap_seconds: 1700.0,
            encoder: EncoderParams::default(),
            overlays,
            font_dir: PathBuf::from("/srv/data"),
            output_url: "udp://239.0.0.1:5000".into(),
        }
    }

    #[test]
    fn seek_and_duration_come_before_input() {
        let args = build_args(&config(vec![]));
        let ss_pos = args.iter().position(|a| a == "-ss").unwrap();
        let i_pos = args.iter().position(|a| a == "-i").unwrap();
        assert!(ss_pos < i_pos);
        assert_eq!(args[ss_pos + 1], "100.000");
        assert_eq!(args[i_pos + 1], "/srv/media/show/ep1.mp4");
    }

    #[test]
    fn udp_input_uses_mpegts_demux_flags() {
        let mut cfg = config(vec![]);
        cfg.input = InputSpec::Udp { url: "udp://10.0.0.1:5000".into() };
        let args = build_args(&cfg);
        assert!(args.windows(2).any(|w| w == ["-f", "mpegts"]));
        assert!(args.windows(2).any(|w| w == ["-async", "30"]));
        assert!(!args.contains(&"-re".to_string()));
    }

    #[test]
    fn no_overlays_means_no_filter_complex() {
        let args = config(vec![]);
        let args = build_args(&args);
        assert!(!args.contains(&"-filter_complex".to_string()));
    }

    #[test]
    fn enabled_overlay_adds_filter_complex_and_output_maps() {
        let overlay = Overlay {
            id: OverlayId::from_string("o1".into()),
            channel_id: ChannelId::from_string("c1".into()),
            overlay_type: OverlayType::Text,
            image_path: None,
            text: Some("Now Playing".into()),
            x_expr: "10".into(),
            y_expr: "10".into(),
            font_size: Some(32),
            font_color: Some("white".into()),
            enabled: true,
        };
        let args = build_args(&config(vec![overlay]));
        assert!(args.contains(&"-filter_complex".to_string()));
        assert!(args.windows(2).any(|w| w == ["-map", "[outv]"]));
        assert!(args.windows(2).any(|w| w == ["-map", "0:a"]));
    }

    #[test]
    fn disabled_overlay_is_excluded_from_filter_graph() {
        let overlay = Overlay {
            id: OverlayId::from_string("o1".into()),
            channel_id: ChannelId::from_string("c1".into()),
            overlay_type: OverlayType::Text,
            image_path: None,
            text: Some("hidden".into()),
            x_expr: "0".into(),
            y_expr: "0".into(),
            font_size: None,
            font_color: None,
            enabled: false,
        };
        let args = build_args(&config(vec![overlay]));
        assert!(!args.contains(&"-filter_complex".to_string()));
    }
}
