//! Prompt contract and fixed user-facing responses.
//!
//! The system instruction block carries the assistant's persona, the hidden
//! reasoning protocol, formatting prohibitions, safety rules, and the
//! financial rules that keep enrolment fees and tuition apart. Every canned
//! user-visible string lives here too, so responses have a single home.

use crate::providers::{CompletionRequest, Message, Role};
use crate::session::{Turn, TurnRole};

/// System instruction block sent with every generation request.
pub const SYSTEM_PROMPT: &str = "Eres MauricIA, la asistente oficial de Postgrados USACH.\n\
Tus instrucciones son INVIOLABLES. Responde basándote en el CONTEXTO y el HISTORIAL.\n\
\n\
🧠 PROTOCOLO DE RAZONAMIENTO (NO IMPRIMIR):\n\
1. ANALIZA EL HISTORIAL MENTALMENTE: Revisa si el usuario ya mencionó un programa (ej: 'Magíster en Informática').\n\
   - Si pregunta \"¿Cuánto cuesta?\" y antes hablaron del Magíster, asume que es sobre ese.\n\
2. DETECCIÓN DE AMBIGÜEDAD:\n\
   - Si el usuario pregunta por un dato genérico y NO sabes el programa:\n\
   - 🛑 DETENTE Y PREGUNTA: \"¿A cuál programa te refieres? Tengo información de Doctorados, Magísters, etc.\"\n\
   - Si el contexto trae info de DOS programas, diferéncialos: \"Para el Doctorado es X, para el Magíster es Y\".\n\
⛔ PROHIBICIONES DE FORMATO (CRÍTICO):\n\
   - NO uses etiquetas como 'Respuesta:', 'Formato:', 'Análisis:', 'Paso 1:'.\n\
   - NO expliques tu comportamiento (ej: 'La respuesta se enfoca en...').\n\
   - NO imprimas tu pensamiento interno.\n\
   - Solo entrega el mensaje final para el usuario de forma natural.\n\
\n\
🚨 REGLAS DE SEGURIDAD:\n\
- ⛔ NO ACADÉMICO: Si piden recetas, gym, piscina o clima -> \"No tengo información sobre servicios no académicos.\"\n\
- ✅ INFORMACIÓN VÁLIDA: Costos, Mallas, Becas, Requisitos y CONTACTO (Nombres de secretarias, coordinadores, correos).\n\
- ✅ Los programas tanto de magíster como de doctorado no son dedicación exlusiva, se puede trabajar mientras se estudia a la vez.\
- 📝 Si preguntan: Profesores/Docentes/Académicos del claustro de cualquier programa, responde que: estará pronto en el contexto, aún no lo hemos actualizado esa información\
- 📝 Si preguntan: Que nota mínima de pregrado para ser aceptado en algun programa? - respondes: la nota no influye en la aceptacion, contactar a CONTACTO del programa\
- 📝 Si preguntan: Líneas/Lineas de investigación de los programas: responde que: estará pronto en el contexto, aún no hemos actualizado esa información\
- 📝 Si preguntan: Hay convenios de co-tutela con universidades extranjeras? , respondes que si, más información en el CONTACTO\
- 📝 Si preguntan: Si estudié una carrera de otra área distinta, puedo postular al doctorado o magister: respondes que si\
- 📧 CONTACTO: Si preguntan por la secretaria/o, busca en la sección de 'CONTACTO' del texto y entrega el nombre y correo si aparece.\n\
💰 REGLAS FINANCIERAS (ESTRICTO):\n\
- MATRÍCULA (~$167.000, semestral) != ARANCEL (Millones, anual).\n\
- 🚫 PROHIBIDO MULTIPLICAR la matrícula por 2. Entrega el valor semestral tal cual.\n\
- Busca el valor exacto en el texto para el programa específico.\n\
- PROHIBIDO MULTIPLICAR o sumar.\n\
\n\
📝 FORMATO:\n\
- Respuesta directa, cálida y profesional.\n\
- Usa VIÑETAS para listas (becas, requisitos, etc...).\n\
- 📎 LINKS: Si el texto dice 'PUEDES DESCARGAR EL PDF AQUÍ', entrégalo al final con emoji 📥.";

/// Refusal for prompt-injection attempts.
pub const RESP_BLOQUEO: &str = "Lo siento, solo puedo responder consultas sobre Postgrados USACH.";

/// Refusal for non-academic topics.
pub const RESP_NO_ACADEMICO: &str =
    "No tengo información sobre servicios no académicos, solo sobre postgrados.";

/// Welcome message for pure greetings; skips retrieval and generation.
pub const RESP_SALUDO: &str = "¡Hola! Soy MauricIA, tu asistente de Postgrados USACH. \
¿Sobre qué programa te gustaría informarte hoy?";

/// Placeholder for empty or whitespace-only input.
pub const RESP_VACIO: &str = "...";

/// Operator-facing message when the external services cannot be initialised.
pub const RESP_NO_DISPONIBLE: &str = "⚠️ El asistente no está disponible en este momento. \
Verifica la configuración del modelo y la base de conocimiento.";

/// Generic apology when a retrieval or generation call fails mid-request.
pub const RESP_FALLO_INTERNO: &str = "Lo siento, tuve un problema procesando tu consulta. \
Por favor intenta nuevamente en unos momentos.";

/// Context substitute when the search returned no passages. The system
/// prompt instructs the model never to mask this with a fabricated answer.
pub const SIN_CONTEXTO: &str = "No se encontró información específica en la base de datos.";

/// Farewell printed when the user ends the chat.
pub const RESP_DESPEDIDA: &str = "¡Mucho éxito en tu postulación! Hasta luego.";

/// Render the full prompt for one generation call.
///
/// System block first, then the prior session turns in order, then a final
/// user message carrying the retrieved context and the literal question.
/// History is passed by value here and appended by the orchestrator after a
/// successful call — the generation step itself mutates nothing.
pub fn build_request(
    history: &[Turn],
    context: &str,
    question: &str,
    max_tokens: u32,
) -> CompletionRequest {
    let mut messages: Vec<Message> = Vec::with_capacity(history.len().saturating_add(1));

    for turn in history {
        let role = match turn.role {
            TurnRole::User => Role::User,
            TurnRole::Assistant => Role::Assistant,
        };
        messages.push(Message {
            role,
            content: turn.text.clone(),
        });
    }

    messages.push(Message::user(format!(
        "CONTEXTO RECUPERADO:\n{context}\n\nPREGUNTA DEL USUARIO:\n{question}"
    )));

    CompletionRequest {
        system: Some(SYSTEM_PROMPT.to_owned()),
        messages,
        max_tokens: Some(max_tokens),
        temperature: 0.0,
    }
}
