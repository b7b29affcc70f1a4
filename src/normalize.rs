use unicode_normalization::UnicodeNormalization;

/// Remove acentos e qualquer caractere fora do ASCII.
///
/// O texto é decomposto (NFKD) e os escalares não-ASCII, incluindo as
/// marcas combinantes, são descartados. A PRODESP rejeita nomes acentuados.
pub fn remove_accents(text: &str) -> String {
    text.nfkd().filter(char::is_ascii).collect()
}
