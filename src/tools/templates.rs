//! Fixed argument templates for the external capture and encoding tools.

use super::ToolInvocation;
use std::path::Path;
use std::time::Duration;

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Single still image written to `dest`, skipping the default 5 s preview delay
pub fn still_capture(program: &str, dest: &Path) -> ToolInvocation {
    ToolInvocation::new(program)
        .args(["-n", "-t", "1", "-o"])
        .arg(path_arg(dest))
}

/// Raw H.264 recording of `duration` written to `dest`
pub fn video_capture(
    program: &str,
    dest: &Path,
    duration: Duration,
    fps: u32,
    resolution: (u32, u32),
) -> ToolInvocation {
    ToolInvocation::new(program)
        .args(["-n", "-t"])
        .arg(duration.as_millis().to_string())
        .arg("--framerate")
        .arg(fps.to_string())
        .arg("--width")
        .arg(resolution.0.to_string())
        .arg("--height")
        .arg(resolution.1.to_string())
        .arg("-o")
        .arg(path_arg(dest))
}

/// Endless MJPEG stream on stdout for the live preview
pub fn mjpeg_preview(program: &str, resolution: (u32, u32), fps: u32) -> ToolInvocation {
    ToolInvocation::new(program)
        .args(["-n", "-t", "0", "--codec", "mjpeg"])
        .arg("--width")
        .arg(resolution.0.to_string())
        .arg("--height")
        .arg(resolution.1.to_string())
        .arg("--framerate")
        .arg(fps.to_string())
        .args(["--flush", "-o", "-"])
}

/// Rewrap a raw H.264 stream into an mp4 container without re-encoding
pub fn transcode_to_mp4(program: &str, source: &Path, dest: &Path, fps: u32) -> ToolInvocation {
    ToolInvocation::new(program)
        .args(["-y", "-loglevel", "error", "-framerate"])
        .arg(fps.to_string())
        .arg("-i")
        .arg(path_arg(source))
        .args(["-vcodec", "copy"])
        .arg(path_arg(dest))
}

/// Grab one frame `offset_seconds` into `video` as a JPEG
pub fn extract_frame(program: &str, video: &Path, dest: &Path, offset_seconds: u32) -> ToolInvocation {
    ToolInvocation::new(program)
        .args(["-y", "-loglevel", "error", "-ss"])
        .arg(format_offset(offset_seconds))
        .arg("-i")
        .arg(path_arg(video))
        .args(["-frames:v", "1"])
        .arg(path_arg(dest))
}

/// Host power-off, e.g. `sudo shutdown -h now`
pub fn power_off(command: &[String]) -> Option<ToolInvocation> {
    let (program, args) = command.split_first()?;
    Some(ToolInvocation::new(program.as_str()).args(args.iter().cloned()))
}

fn format_offset(seconds: u32) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds / 60) % 60,
        seconds % 60
    )
}
