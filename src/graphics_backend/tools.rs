//! Outils OpenGL : diagnostics du contexte, callback de debug, compilation
//! de programmes avec varyings de transform feedback et mise en forme des
//! erreurs GLSL.

use gl::types::*;
use log::{debug, info, warn};
use regex::Regex;
use std::collections::HashMap;
use std::ffi::{CStr, CString};
use std::os::raw::c_void;
use std::ptr;
use std::sync::Mutex;

use crate::error::BackendError;

lazy_static::lazy_static! {
    static ref DEBUG_MESSAGE_COUNT: Mutex<HashMap<u32, u32>> = Mutex::new(HashMap::new());

    // Intel/Mesa "0:12(105)", NVIDIA "0(12) :", AMD ": 0:12:"
    static ref GLSL_LINE_PATTERNS: Vec<Regex> = [
        r"(\d+):(\d+)\((\d+)\)",
        r"(\d+)\((\d+)\)\s*:",
        r":\s*(\d+):(\d+):",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect();
}

#[macro_export]
macro_rules! cstr {
    ($s:expr) => {
        concat!($s, "\0").as_ptr() as *const gl::types::GLchar
    };
}

unsafe fn gl_string(name: GLenum) -> String {
    let raw = gl::GetString(name);
    if raw.is_null() {
        return "Unknown".into();
    }
    CStr::from_ptr(raw as *const GLchar)
        .to_string_lossy()
        .into_owned()
}

/// Affiche vendor / renderer / version du contexte courant.
///
/// # Safety
/// Le contexte OpenGL doit être courant sur le thread appelant.
pub unsafe fn show_opengl_context_info() {
    info!("🖥 OpenGL context info:");
    info!("  Vendor   : {}", gl_string(gl::VENDOR));
    info!("  Renderer : {}", gl_string(gl::RENDERER));
    info!("  OpenGL   : {}", gl_string(gl::VERSION));
    info!("  GLSL     : {}", gl_string(gl::SHADING_LANGUAGE_VERSION));

    let mut num_ext = 0;
    gl::GetIntegerv(gl::NUM_EXTENSIONS, &mut num_ext);
    debug!("  Extensions: {} detected", num_ext);

    let err = gl::GetError();
    if err != gl::NO_ERROR {
        warn!("glerror consumed after getting context info: 0x{:X}", err);
    }
}

extern "system" fn gl_debug_callback(
    _source: GLenum,
    type_: GLenum,
    id: GLuint,
    severity: GLenum,
    _length: GLsizei,
    message: *const GLchar,
    _user_param: *mut c_void,
) {
    if severity == gl::DEBUG_SEVERITY_NOTIFICATION {
        return;
    }
    let msg = unsafe { CStr::from_ptr(message).to_string_lossy() };

    let mut counts = match DEBUG_MESSAGE_COUNT.lock() {
        Ok(counts) => counts,
        Err(poisoned) => poisoned.into_inner(),
    };
    let count = counts.entry(id).or_insert(0);
    *count += 1;
    // Un message répété chaque frame n'est relogué qu'une fois par seconde environ
    if *count == 1 || (*count).is_multiple_of(60) {
        let kind = match type_ {
            gl::DEBUG_TYPE_ERROR => "Error",
            gl::DEBUG_TYPE_UNDEFINED_BEHAVIOR => "Undefined Behavior",
            gl::DEBUG_TYPE_PERFORMANCE => "Performance",
            _ => "Other",
        };
        warn!("[OpenGL Debug] id: {:X}, type: {}, message: {}", id, kind, msg);
    }
}

/// Active la sortie de debug si le driver l'expose.
///
/// # Safety
/// Le contexte OpenGL doit être courant sur le thread appelant.
pub unsafe fn setup_opengl_debug() {
    if !gl::DebugMessageCallback::is_loaded() {
        debug!("GL debug output unavailable on this context");
        return;
    }
    gl::Enable(gl::DEBUG_OUTPUT);
    gl::Enable(gl::DEBUG_OUTPUT_SYNCHRONOUS);
    gl::DebugMessageCallback(Some(gl_debug_callback), ptr::null());
}

/// Traduit `glGetError` en erreur backend.
///
/// # Safety
/// Le contexte OpenGL doit être courant sur le thread appelant.
pub unsafe fn check_gl_error(stage: &str) -> Result<(), BackendError> {
    match gl::GetError() {
        gl::NO_ERROR => Ok(()),
        gl::CONTEXT_LOST => Err(BackendError::ContextLost),
        gl::OUT_OF_MEMORY => Err(BackendError::OutOfMemory(0)),
        code => Err(BackendError::Other(format!("{stage}: GL error 0x{code:X}"))),
    }
}

unsafe fn info_log(object: GLuint, is_program: bool) -> String {
    let mut len = 0;
    if is_program {
        gl::GetProgramiv(object, gl::INFO_LOG_LENGTH, &mut len);
    } else {
        gl::GetShaderiv(object, gl::INFO_LOG_LENGTH, &mut len);
    }
    let mut buf = vec![0u8; len.max(1) as usize];
    if is_program {
        gl::GetProgramInfoLog(object, len, ptr::null_mut(), buf.as_mut_ptr() as *mut GLchar);
    } else {
        gl::GetShaderInfoLog(object, len, ptr::null_mut(), buf.as_mut_ptr() as *mut GLchar);
    }
    String::from_utf8_lossy(&buf)
        .trim_matches(char::from(0))
        .to_string()
}

unsafe fn compile_stage(src: &str, ty: GLenum) -> Result<GLuint, BackendError> {
    let c_src = CString::new(src).map_err(|e| BackendError::ShaderCompile(e.to_string()))?;
    let shader = gl::CreateShader(ty);
    gl::ShaderSource(shader, 1, &c_src.as_ptr(), ptr::null());
    gl::CompileShader(shader);

    let mut success = gl::FALSE as GLint;
    gl::GetShaderiv(shader, gl::COMPILE_STATUS, &mut success);
    if success == gl::TRUE as GLint {
        return Ok(shader);
    }

    let log = info_log(shader, false);
    gl::DeleteShader(shader);
    let mut message = log.clone();
    if let Some((line, _)) = parse_glsl_error_line(&log) {
        message.push_str(&format_glsl_error_context(src, line));
    }
    Err(BackendError::ShaderCompile(message))
}

/// Compile et lie un programme. Les varyings de transform feedback sont
/// déclarés avant l'édition de liens, en mode entrelacé.
///
/// # Safety
/// Le contexte OpenGL doit être courant sur le thread appelant.
pub unsafe fn compile_program(
    vertex_src: &str,
    fragment_src: &str,
    feedback_varyings: &[String],
) -> Result<GLuint, BackendError> {
    let vs = compile_stage(vertex_src, gl::VERTEX_SHADER)?;
    let fs = match compile_stage(fragment_src, gl::FRAGMENT_SHADER) {
        Ok(fs) => fs,
        Err(e) => {
            gl::DeleteShader(vs);
            return Err(e);
        }
    };

    let program = gl::CreateProgram();
    gl::AttachShader(program, vs);
    gl::AttachShader(program, fs);

    if !feedback_varyings.is_empty() {
        let names: Vec<CString> = feedback_varyings
            .iter()
            .filter_map(|v| CString::new(v.as_str()).ok())
            .collect();
        let ptrs: Vec<*const GLchar> = names.iter().map(|n| n.as_ptr()).collect();
        gl::TransformFeedbackVaryings(
            program,
            ptrs.len() as GLsizei,
            ptrs.as_ptr(),
            gl::INTERLEAVED_ATTRIBS,
        );
    }

    gl::LinkProgram(program);
    gl::DetachShader(program, vs);
    gl::DetachShader(program, fs);
    gl::DeleteShader(vs);
    gl::DeleteShader(fs);

    let mut success = gl::FALSE as GLint;
    gl::GetProgramiv(program, gl::LINK_STATUS, &mut success);
    if success != gl::TRUE as GLint {
        let log = info_log(program, true);
        gl::DeleteProgram(program);
        return Err(BackendError::ProgramLink(log));
    }
    Ok(program)
}

/// Extrait le numéro de ligne d'un log de compilation GLSL.
pub fn parse_glsl_error_line(log: &str) -> Option<(usize, usize)> {
    // Le numéro de ligne est toujours le deuxième groupe
    GLSL_LINE_PATTERNS.iter().find_map(|re| {
        re.captures(log)
            .and_then(|cap| cap.get(2))
            .and_then(|m| m.as_str().parse::<usize>().ok())
            .map(|line| (line, 0))
    })
}

/// Extrait du source autour de la ligne fautive (2 lignes de contexte).
pub fn format_glsl_error_context(src: &str, line_number: usize) -> String {
    const CONTEXT: usize = 2;
    let lines: Vec<&str> = src.lines().collect();
    if lines.is_empty() || line_number == 0 {
        return String::new();
    }

    let mut output = format!("\n🔍 Error context (line {}):\n", line_number);
    let start = line_number.saturating_sub(1 + CONTEXT).min(lines.len());
    let end = (line_number + CONTEXT).min(lines.len());
    for (offset, line) in lines[start..end].iter().enumerate() {
        let current = start + offset + 1;
        if current == line_number {
            output.push_str(&format!("> {:>3} | {}\n", current, line));
            output.push_str(&format!("        {}\n", "^".repeat(line.len().min(80))));
        } else {
            output.push_str(&format!("  {:>3} | {}\n", current, line));
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_vendor_log_formats() {
        let cases = [
            ("0:12(105): error: undefined variable", Some(12)),
            ("0(7) : error C1000: undefined variable", Some(7)),
            ("ERROR: 0:42: 'vLifetime' : undeclared identifier", Some(42)),
            ("0:5(10): error and 0:6(20): another", Some(5)),
            ("Error: no line info", None),
            ("", None),
        ];
        for (log, expected) in cases {
            assert_eq!(parse_glsl_error_line(log).map(|(l, _)| l), expected, "{log}");
        }
    }

    #[test]
    fn trailing_nul_does_not_break_parsing() {
        let log = "0:10(2): error: 'toto' undeclared\0";
        assert_eq!(parse_glsl_error_line(log).map(|(l, _)| l), Some(10));
    }

    #[test]
    fn error_context_marks_faulty_line() {
        let src = "#version 330 core\nvoid main() {\n    gl_Position = vec4(0.0)\n}";
        let out = format_glsl_error_context(src, 3);
        assert!(out.contains(">   3 |     gl_Position = vec4(0.0)"));
        assert!(out.contains("    1 | #version 330 core"));
    }

    #[test]
    fn error_context_edge_cases() {
        assert_eq!(format_glsl_error_context("", 1), "");
        assert_eq!(format_glsl_error_context("void main() {}", 0), "");
        // Ligne au-delà du source : pas de panique
        let out = format_glsl_error_context("a\nb", 50);
        assert!(out.contains("line 50"));
    }
}
