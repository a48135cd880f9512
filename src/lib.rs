// ============================================================================
// LazyFX - Library
// ============================================================================
// Expose les modules publics pour le binaire et les tests
// ============================================================================

pub mod api;       // Sources de taux (HTTP) et fallback
pub mod app;       // État de l'application TUI
pub mod config;    // Configuration (défauts + variables d'environnement)
pub mod converter; // Conversion bidirectionnelle
pub mod models;    // Structures de données
pub mod provider;  // Résolution des taux + garde anti-réponse périmée
pub mod ui;        // Interface utilisateur
