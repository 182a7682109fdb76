//! # Default Prompt Templates
//!
//! Query generation, follow-up filter parsing, entity rewriting, and the
//! answer-composition framings. The wording mixes English instructions with
//! Indonesian output directives because the service answers in Indonesian.

// --- Query Generation ---

/// Placeholders: `{language}`, `{db_name}`
pub const SQL_GENERATION_SYSTEM_PROMPT: &str = "You are an expert {language} query generator for a {db_name} database. \
Your only output is a single valid read-only {language} query, with no explanations and no markdown.";

/// Placeholders: `{table}`, `{description}`, `{schema}`, `{samples}`,
/// `{question}`, `{limit_rule}`, `{row_cap}`
pub const SQL_GENERATION_USER_PROMPT: &str = r#"TABLE: {table}
DESCRIPTION: {description}

TABLE SCHEMA:
{schema}

SAMPLE DATA (for context):
{samples}

USER QUESTION: "{question}"

INSTRUCTIONS:
1. Generate ONLY a valid query based on the question
2. {limit_rule}
3. STRICTLY use ONLY columns that exist in the schema above - DO NOT assume or invent column names
4. For counting rows, use COUNT(*) - DO NOT use SUM() unless explicitly needed for numeric columns
5. For "berapa total" or "how many", use COUNT(*) to count rows
6. Use GROUP BY when showing breakdown by categories
7. Handle NULL values appropriately
8. For text searches with names, use LIKE with wildcards and be flexible with spacing
   (e.g. WHERE NameColumn LIKE '%First%Last%' OR NameColumn LIKE '%First Last%')
9. Return at most {row_cap} rows

Return ONLY the query, nothing else. No markdown, no code blocks, just the query.

Query:"#;

// --- Follow-up filter parsing ---

/// Placeholder: `{sentinel}`
pub const FOLLOWUP_FILTER_SYSTEM_PROMPT: &str = "You translate a short follow-up request into a single SQL WHERE-clause fragment. \
Output the fragment only, without the WHERE keyword, without explanations. \
If the request cannot be expressed as a filter, output exactly {sentinel}.";

/// Placeholders: `{aliases}`, `{followup}`, `{sentinel}`
pub const FOLLOWUP_FILTER_USER_PROMPT: &str = r#"Known column aliases (alias -> column):
{aliases}

Examples:
- "yang tahun 2025 saja" -> YEAR(CreatedDate) = 2025
- "yang perempuan" -> gender = 'Female'
- "hanya dari departemen IT" -> department = 'IT'
- "apa kabar" -> {sentinel}

Follow-up request: "{followup}"

Fragment:"#;

// --- Entity substitution rewrite ---

pub const ENTITY_REWRITE_SYSTEM_PROMPT: &str = "You rewrite a previous question so that it asks about a different subject. \
Keep everything else about the question unchanged. Output only the rewritten question.";

/// Placeholders: `{previous_question}`, `{current_question}`
pub const ENTITY_REWRITE_USER_PROMPT: &str = r#"Previous question: "{previous_question}"
The user now asks: "{current_question}"

Rewrite the previous question replacing only the person or subject it asks about
with the one named in the new request. Keep the language of the previous question.

Rewritten question:"#;

// --- Answer composition framings ---

/// Placeholder: `{company}`
pub const ANSWER_SYSTEM_INTERNAL: &str = "Kamu adalah AI assistant dari {company} yang cerdas dan membantu. \
Kamu memiliki akses ke database internal perusahaan. \
Profesional dan ramah, menjawab dengan bahasa Indonesia yang natural. \
Jika tidak ada data, katakan dengan jujur bahwa data tidak ditemukan. \
Gunakan formatting markdown jika perlu (bold, list, dll).";

pub const ANSWER_SYSTEM_EXTERNAL: &str = "You are a helpful general-purpose AI assistant. \
Answer from general knowledge, in the user's language. \
Do not claim access to any internal company data and do not mention any company affiliation.";

pub const TRANSCRIPT_PREAMBLE: &str = "CONVERSATION HISTORY:\n{transcript}\n\n\
IMPORTANT: Gunakan konteks percakapan di atas untuk memahami pertanyaan user yang \
mungkin mereferensikan topik sebelumnya.\n\n---\n\n";

// --- Answer payload branches (exactly one per request) ---

/// Placeholders: `{question}`, `{searched_name}`, `{names}`
pub const SUGGESTIONS_INSTRUCTIONS: &str = r#"Pertanyaan user: {question}

Nama "{searched_name}" TIDAK ditemukan di database. Nama yang mirip:
{names}

Instruksi:
1. Beritahu dengan sopan bahwa nama "{searched_name}" tidak ditemukan
2. Tawarkan maksimal 3 nama teratas yang paling mirip dari daftar di atas
3. Tanyakan kembali: "Apakah salah satu dari nama di atas yang Anda maksud?"
4. JANGAN sebutkan detail teknis (tabel, SQL, database, dll)

Jawab dengan bahasa Indonesia yang natural dan helpful:"#;

/// Placeholders: `{question}`, `{count}`
pub const COUNT_INSTRUCTIONS: &str = r#"Pertanyaan user: {question}

Hasil perhitungan dari database: {count}

Instruksi:
1. Sebutkan angka {count} itu secara langsung sebagai jawaban
2. JANGAN mengarang rincian yang tidak ada dalam data
3. JANGAN sebutkan sumber teknis data (nama tabel, database, SQL query, dll)

Jawab dengan bahasa Indonesia yang natural dan profesional:"#;

/// Placeholders: `{question}`, `{data}`
pub const ROWS_INSTRUCTIONS: &str = r#"Pertanyaan user: {question}

Data yang saya temukan untuk menjawab pertanyaan Anda:
{data}

Instruksi:
1. JANGAN sebutkan sumber teknis data (nama tabel, database, schema, SQL query, dll)
2. JANGAN PERNAH menambahkan debug info sendiri; sistem menambahkannya untuk user yang berwenang
3. JANGAN mengarang nama kolom, tabel, atau baris yang tidak ada di data di atas
4. Jika user meminta rincian padahal data hanya berisi jumlah, katakan demikian dan tawarkan query ulang
5. Ringkas data tabel/array menjadi informasi yang mudah dibaca
6. Berikan insight tambahan jika relevan
7. Jika pertanyaan merujuk ke percakapan sebelumnya, gunakan conversation history di atas

Jawab dengan bahasa Indonesia yang natural, profesional, dan informatif:"#;

/// Placeholder: `{question}`, `{message}`
pub const ACCESS_DENIED_INSTRUCTIONS: &str = r#"Pertanyaan user: {question}

Akses ke data ini ditolak. Pesan untuk user: "{message}"

Sampaikan pesan tersebut dengan sopan, tanpa menyebutkan detail teknis apa pun.

Jawab dengan bahasa Indonesia yang natural:"#;

/// Placeholder: `{question}`
pub const NO_DATA_INTERNAL_INSTRUCTIONS: &str = r#"Pertanyaan user: {question}

Tidak ada data yang ditemukan untuk pertanyaan ini.

Katakan dengan jelas bahwa datanya tidak ditemukan. JANGAN mengarang data,
nama tabel, atau angka. Tawarkan untuk mencoba pertanyaan yang lain.

Jawab dengan bahasa Indonesia yang natural:"#;

/// Placeholder: `{question}`
pub const NO_DATA_EXTERNAL_INSTRUCTIONS: &str = r#"User question: {question}

Answer from your general knowledge. If the question refers to the earlier
conversation, use the history above. Do not claim internal company data."#;

/// Fills `{placeholder}` slots in a template.
pub fn render(template: &str, replacements: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in replacements {
        out = out.replace(&format!("{{{key}}}"), value);
    }
    out
}
